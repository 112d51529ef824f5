use lifeplan::bootstrap::BootstrapFiles;
use lifeplan::db::*;
use lifeplan::models::*;
use lifeplan::services::GC_BATCH_SIZE;
use lifeplan::use_cases::*;
use speculate2::speculate;
use tempfile::TempDir;

fn name(raw: &str) -> EntityName {
    EntityName::from_raw(raw).expect("valid name")
}

fn date(raw: &str) -> ADate {
    ADate::from_raw(raw).expect("valid date")
}

fn logged_in_env(dir: &TempDir) -> UseCaseEnv {
    let connection = Connection::open_memory().expect("Failed to open in-memory database");
    connection.prepare().expect("Failed to run migrations");
    let env = UseCaseEnv::new(DomainStorageEngine::new(connection), BootstrapFiles::new(dir.path()));
    let init = env
        .run_mutation(
            &InitWorkspace,
            InitWorkspaceArgs {
                user_email: EmailAddress::from_raw("gc@example.com").expect("valid email"),
                user_name: name("Collector"),
                password: "sweep-it-all".to_string(),
                workspace_name: name("Sweepable"),
                feature_flags: FeatureFlags::default(),
            },
        )
        .expect("Failed to init workspace");
    env.with_principal(Some(Principal {
        user_ref_id: init.user.ref_id(),
        workspace_ref_id: init.workspace.ref_id(),
        expires_at: Timestamp::now().plus(session_lifetime()),
    }))
}

fn sweep(env: &UseCaseEnv, archive_done: bool) -> UseCaseResult<GcLogEntry> {
    env.run_logged_in_batch(&GcSweep, GcSweepArgs { archive_done })
}

fn create_project(env: &UseCaseEnv, key: &str) -> Project {
    env.run_logged_in_mutation(
        &CreateProject,
        CreateProjectArgs {
            key: EntityKey::from_raw(key).expect("valid key"),
            name: name("Chores"),
        },
    )
    .expect("Failed to create project")
}

fn create_task(env: &UseCaseEnv, project: &Project) -> InboxTask {
    env.run_logged_in_mutation(
        &CreateInboxTask,
        CreateInboxTaskArgs {
            name: name("Take out the bins"),
            project_ref_id: project.ref_id(),
            big_plan_ref_id: None,
            suggested_date: SuggestedDate::default(),
        },
    )
    .expect("Failed to create task")
}

fn complete(env: &UseCaseEnv, task: &InboxTask) {
    env.run_logged_in_mutation(
        &UpdateInboxTask,
        UpdateInboxTaskArgs {
            ref_id: task.ref_id(),
            name: None,
            status: Some(InboxTaskStatus::Done),
            project_ref_id: None,
            suggested_date: None,
        },
    )
    .expect("Failed to complete task");
}

fn generate_periodic(env: &UseCaseEnv) {
    env.run_logged_in_mutation(&GeneratePeriodic, GeneratePeriodicArgs { today: date("2024-03-06") })
        .expect("Failed to generate journals and plans");
}

fn all_journals(env: &UseCaseEnv) -> Vec<Journal> {
    env.run_logged_in_readonly(&FindJournals, FindJournalsArgs { include_archived: true, period: None })
        .expect("Failed to find journals")
}

fn create_habit(env: &UseCaseEnv, project: &Project, schedule: HabitSchedule) -> Habit {
    env.run_logged_in_mutation(
        &CreateHabit,
        CreateHabitArgs {
            name: name("Run"),
            project_ref_id: project.ref_id(),
            schedule,
        },
    )
    .expect("Failed to create habit")
}

fn generate_habits(env: &UseCaseEnv, today: &str) {
    env.run_logged_in_mutation(
        &GenerateHabitTasks,
        GenerateHabitTasksArgs { today: date(today), habit_ref_ids: None },
    )
    .expect("Failed to generate habit tasks");
}

fn reschedule(env: &UseCaseEnv, habit: &Habit, schedule: HabitSchedule) {
    env.run_logged_in_mutation(
        &UpdateHabit,
        UpdateHabitArgs {
            ref_id: habit.ref_id(),
            name: None,
            schedule: Some(schedule),
            project_ref_id: None,
            suspended: None,
        },
    )
    .expect("Failed to reschedule habit");
}

fn live_tasks(env: &UseCaseEnv) -> Vec<InboxTask> {
    env.run_logged_in_readonly(&FindInboxTasks, FindInboxTasksArgs::default())
        .expect("Failed to find tasks")
        .tasks
}

fn archive_row(env: &UseCaseEnv, table: &str, ref_id: EntityId) {
    env.storage
        .unit_of_work(|uow| {
            uow.sqlite().execute(
                &format!(
                    "UPDATE {table} SET archived = 1, archived_time = ?1, archival_reason = 'user'
                     WHERE ref_id = ?2"
                ),
                rusqlite::params![Timestamp::now().as_raw(), ref_id.as_i64()],
            )?;
            Ok::<_, StoreError>(())
        })
        .expect("Failed to archive row");
}

fn reload<T>(env: &UseCaseEnv, ref_id: EntityId) -> T
where
    T: SqliteRecord + LeafEntity,
    for<'c> SqliteEntityRepository<'c, T>: LeafEntityRepository<T>,
{
    env.storage
        .read_view(|view| view.repository::<T>().load_by_id(ref_id, true))
        .expect("Failed to reload entity")
}

fn gc_log(env: &UseCaseEnv) -> Vec<GcLogEntry> {
    env.run_logged_in_readonly(&GcLogTail, GcLogTailArgs::default())
        .expect("Failed to read gc log")
}

speculate! {
    before {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let env = logged_in_env(&dir);
    }

    describe "sweep" {
        it "records an empty run" {
            let entry = sweep(&env, false).expect("Failed to sweep");
            assert_eq!(entry.total_archived(), 0);
            assert_eq!(entry.source(), EventSource::Gc);
            assert_eq!(gc_log(&env).len(), 1);
        }

        it "archives live children of an archived parent" {
            let project = create_project(&env, "garden");
            let habit = env
                .run_logged_in_mutation(
                    &CreateHabit,
                    CreateHabitArgs {
                        name: name("Water plants"),
                        project_ref_id: project.ref_id(),
                        schedule: HabitSchedule::new(RecurringTaskPeriod::Daily, HabitRepeatsStrategy::AllSame, 1)
                            .expect("valid schedule"),
                    },
                )
                .expect("Failed to create habit");

            // Archive the project row behind the cascade's back.
            archive_row(&env, "project", project.ref_id());

            let entry = sweep(&env, false).expect("Failed to sweep");
            assert_eq!(entry.entity_counts().get(&EntityKind::Habit), Some(&1));

            let habit: Habit = reload(&env, habit.ref_id());
            assert!(habit.is_archived());
            assert_eq!(habit.core().archival_reason(), Some(ArchivalReason::Gc));
        }

        it "archives generated journals and plans for periods no longer configured" {
            env.run_logged_in_mutation(
                &UpdateJournalPeriods,
                UpdateJournalPeriodsArgs {
                    periods: [RecurringTaskPeriod::Daily, RecurringTaskPeriod::Weekly].into(),
                },
            )
            .expect("Failed to configure journals");
            generate_periodic(&env);
            let user_daily = env
                .run_logged_in_mutation(
                    &CreateJournal,
                    CreateJournalArgs { right_now: date("2024-03-07"), period: RecurringTaskPeriod::Daily },
                )
                .expect("Failed to create user journal");

            env.run_logged_in_mutation(
                &UpdateJournalPeriods,
                UpdateJournalPeriodsArgs { periods: [RecurringTaskPeriod::Weekly].into() },
            )
            .expect("Failed to drop daily journals");
            env.run_logged_in_mutation(
                &UpdateTimePlanPeriods,
                UpdateTimePlanPeriodsArgs { periods: [RecurringTaskPeriod::Daily].into() },
            )
            .expect("Failed to drop weekly plans");

            let entry = sweep(&env, false).expect("Failed to sweep");
            assert_eq!(entry.entity_counts().get(&EntityKind::Journal), Some(&1));
            assert_eq!(entry.entity_counts().get(&EntityKind::TimePlan), Some(&1));

            for journal in all_journals(&env) {
                let dropped = journal.period() == RecurringTaskPeriod::Daily
                    && journal.source() == JournalSource::Generated;
                assert_eq!(journal.is_archived(), dropped, "{}", journal.name());
            }
            assert!(!reload::<Journal>(&env, user_daily.ref_id()).is_archived());
        }

        it "archives habit tasks beyond the current repeat count" {
            let project = create_project(&env, "fitness");
            let habit = env
                .run_logged_in_mutation(
                    &CreateHabit,
                    CreateHabitArgs {
                        name: name("Push-ups"),
                        project_ref_id: project.ref_id(),
                        schedule: HabitSchedule::new(RecurringTaskPeriod::Daily, HabitRepeatsStrategy::AllSame, 3)
                            .expect("valid schedule"),
                    },
                )
                .expect("Failed to create habit");
            env.run_logged_in_mutation(
                &GenerateHabitTasks,
                GenerateHabitTasksArgs { today: date("2024-03-06"), habit_ref_ids: None },
            )
            .expect("Failed to generate");
            env.run_logged_in_mutation(
                &UpdateHabit,
                UpdateHabitArgs {
                    ref_id: habit.ref_id(),
                    name: None,
                    schedule: Some(
                        HabitSchedule::new(RecurringTaskPeriod::Daily, HabitRepeatsStrategy::AllSame, 1)
                            .expect("valid schedule"),
                    ),
                    project_ref_id: None,
                    suspended: None,
                },
            )
            .expect("Failed to shrink schedule");

            let entry = sweep(&env, false).expect("Failed to sweep");
            assert_eq!(entry.entity_counts().get(&EntityKind::InboxTask), Some(&2));

            let remaining = env
                .run_logged_in_readonly(&FindInboxTasks, FindInboxTasksArgs::default())
                .expect("Failed to find tasks");
            assert_eq!(remaining.tasks.len(), 1);
            assert_eq!(remaining.tasks[0].recurring().map(|slot| slot.repeat_index), Some(0));
        }

        it "archives habit tasks left over from a previous period" {
            let project = create_project(&env, "running");
            let weekly = HabitSchedule::new(RecurringTaskPeriod::Weekly, HabitRepeatsStrategy::AllSame, 1)
                .expect("valid schedule");
            let habit = create_habit(&env, &project, weekly);
            generate_habits(&env, "2024-03-06");

            let monthly = HabitSchedule::new(RecurringTaskPeriod::Monthly, HabitRepeatsStrategy::AllSame, 1)
                .expect("valid schedule");
            reschedule(&env, &habit, monthly);
            generate_habits(&env, "2024-03-06");
            assert_eq!(live_tasks(&env).len(), 2);

            let entry = sweep(&env, false).expect("Failed to sweep");
            assert_eq!(entry.entity_counts().get(&EntityKind::InboxTask), Some(&1));
            let remaining = live_tasks(&env);
            assert_eq!(remaining.len(), 1);
            assert_eq!(
                remaining[0].recurring().map(|slot| slot.timeline.as_str()),
                Some("2024-03")
            );
        }

        it "keeps habit tasks of earlier instances of the same period" {
            let project = create_project(&env, "reading");
            let weekly = HabitSchedule::new(RecurringTaskPeriod::Weekly, HabitRepeatsStrategy::AllSame, 1)
                .expect("valid schedule");
            create_habit(&env, &project, weekly);
            generate_habits(&env, "2024-03-06");
            generate_habits(&env, "2024-03-13");

            let entry = sweep(&env, false).expect("Failed to sweep");
            assert_eq!(entry.total_archived(), 0);
            assert_eq!(live_tasks(&env).len(), 2);
        }

        it "leaves finished work alone unless asked" {
            let project = create_project(&env, "house");
            let done = create_task(&env, &project);
            let open = create_task(&env, &project);
            complete(&env, &done);

            let entry = sweep(&env, false).expect("Failed to sweep");
            assert_eq!(entry.total_archived(), 0);
            assert!(!reload::<InboxTask>(&env, done.ref_id()).is_archived());

            let entry = sweep(&env, true).expect("Failed to sweep");
            assert_eq!(entry.entity_counts().get(&EntityKind::InboxTask), Some(&1));
            assert!(reload::<InboxTask>(&env, done.ref_id()).is_archived());
            assert!(!reload::<InboxTask>(&env, open.ref_id()).is_archived());
        }

        it "splits a large cascade across batches with one archival time" {
            let project = create_project(&env, "album");
            let plan = env
                .run_logged_in_mutation(
                    &CreateBigPlan,
                    CreateBigPlanArgs {
                        name: name("Record the album"),
                        project_ref_id: project.ref_id(),
                        suggested_date: SuggestedDate::default(),
                    },
                )
                .expect("Failed to create big plan");
            let extra = GC_BATCH_SIZE + 10;
            let tasks: Vec<InboxTask> = (0..extra)
                .map(|n| {
                    env.run_logged_in_mutation(
                        &CreateInboxTask,
                        CreateInboxTaskArgs {
                            name: name(&format!("Track {n}")),
                            project_ref_id: project.ref_id(),
                            big_plan_ref_id: Some(plan.ref_id()),
                            suggested_date: SuggestedDate::default(),
                        },
                    )
                    .expect("Failed to create task")
                })
                .collect();
            env.run_logged_in_mutation(
                &UpdateBigPlanStatus,
                UpdateBigPlanStatusArgs { ref_id: plan.ref_id(), status: BigPlanStatus::Done },
            )
            .expect("Failed to finish big plan");

            let entry = sweep(&env, true).expect("Failed to sweep");
            assert_eq!(entry.entity_counts().get(&EntityKind::BigPlan), Some(&1));
            assert_eq!(entry.entity_counts().get(&EntityKind::InboxTask), Some(&extra));

            let plan: BigPlan = reload(&env, plan.ref_id());
            let archived_time = plan.core().archived_time();
            assert!(archived_time.is_some());
            for task in &tasks {
                let task: InboxTask = reload(&env, task.ref_id());
                assert!(task.is_archived());
                assert_eq!(task.core().archived_time(), archived_time);
                assert_eq!(task.core().archival_reason(), Some(ArchivalReason::Gc));
            }
        }

        it "writes no log entry when cancelled" {
            let cancellation = Cancellation::default();
            cancellation.cancel();
            let cancelled = env.clone().with_cancellation(cancellation);

            let err = sweep(&cancelled, false).expect_err("cancelled sweep must fail");
            assert!(matches!(err, UseCaseError::Timeout));
            assert!(gc_log(&env).is_empty());
        }
    }

    describe "workspace scope" {
        it "ignores rows of other workspaces" {
            let project = create_project(&env, "old");
            let habit = create_habit(
                &env,
                &project,
                HabitSchedule::new(RecurringTaskPeriod::Daily, HabitRepeatsStrategy::AllSame, 1)
                    .expect("valid schedule"),
            );
            let done = create_task(&env, &project);
            complete(&env, &done);
            archive_row(&env, "project", project.ref_id());
            let first_workspace = env.principal.expect("logged in").workspace_ref_id;
            archive_row(&env, "workspace", first_workspace);

            let init = env
                .run_mutation(
                    &InitWorkspace,
                    InitWorkspaceArgs {
                        user_email: EmailAddress::from_raw("second@example.com").expect("valid email"),
                        user_name: name("Second"),
                        password: "another-long-one".to_string(),
                        workspace_name: name("Fresh"),
                        feature_flags: FeatureFlags::default(),
                    },
                )
                .expect("Failed to init second workspace");
            let second = env.clone().with_principal(Some(Principal {
                user_ref_id: init.user.ref_id(),
                workspace_ref_id: init.workspace.ref_id(),
                expires_at: Timestamp::now().plus(session_lifetime()),
            }));

            let entry = sweep(&second, true).expect("Failed to sweep");
            assert_eq!(entry.total_archived(), 0);
            assert!(!reload::<Habit>(&env, habit.ref_id()).is_archived());
            assert!(!reload::<InboxTask>(&env, done.ref_id()).is_archived());
        }
    }

    describe "log tail" {
        it "returns the newest entries first" {
            let first = sweep(&env, false).expect("first sweep");
            let second = sweep(&env, false).expect("second sweep");

            let tail = env
                .run_logged_in_readonly(&GcLogTail, GcLogTailArgs { limit: 1 })
                .expect("Failed to read gc log");
            assert_eq!(tail.len(), 1);
            assert_eq!(tail[0].ref_id(), second.ref_id());
            assert_ne!(tail[0].ref_id(), first.ref_id());
        }

        it "rejects a zero limit" {
            let err = env
                .run_logged_in_readonly(&GcLogTail, GcLogTailArgs { limit: 0 })
                .expect_err("zero limit");
            assert!(matches!(err, UseCaseError::Validation(_)));
        }
    }
}
