use lifeplan::bootstrap::BootstrapFiles;
use lifeplan::db::*;
use lifeplan::models::*;
use lifeplan::use_cases::*;
use lifeplan::services::PeriodicSummary;
use speculate2::speculate;
use tempfile::TempDir;

fn name(raw: &str) -> EntityName {
    EntityName::from_raw(raw).expect("valid name")
}

fn date(raw: &str) -> ADate {
    ADate::from_raw(raw).expect("valid date")
}

fn fresh_env(dir: &TempDir) -> UseCaseEnv {
    let connection = Connection::open_memory().expect("Failed to open in-memory database");
    connection.prepare().expect("Failed to run migrations");
    UseCaseEnv::new(DomainStorageEngine::new(connection), BootstrapFiles::new(dir.path()))
}

/// An initialised workspace with a valid session.
fn logged_in_env(dir: &TempDir) -> UseCaseEnv {
    let env = fresh_env(dir);
    let init = env
        .run_mutation(
            &InitWorkspace,
            InitWorkspaceArgs {
                user_email: EmailAddress::from_raw("ada@example.com").expect("valid email"),
                user_name: name("Ada"),
                password: "correct horse".to_string(),
                workspace_name: name("Home"),
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

fn workspace_ref_id(env: &UseCaseEnv) -> EntityId {
    env.principal.expect("logged in").workspace_ref_id
}

fn create_project(env: &UseCaseEnv, key: &str) -> Project {
    env.run_logged_in_mutation(
        &CreateProject,
        CreateProjectArgs {
            key: EntityKey::from_raw(key).expect("valid key"),
            name: name("Some work"),
        },
    )
    .expect("Failed to create project")
}

fn create_habit(env: &UseCaseEnv, project: &Project, schedule: HabitSchedule) -> Habit {
    env.run_logged_in_mutation(
        &CreateHabit,
        CreateHabitArgs {
            name: name("Stretch"),
            project_ref_id: project.ref_id(),
            schedule,
        },
    )
    .expect("Failed to create habit")
}

fn create_task(env: &UseCaseEnv, project: &Project, raw_name: &str) -> InboxTask {
    env.run_logged_in_mutation(
        &CreateInboxTask,
        CreateInboxTaskArgs {
            name: name(raw_name),
            project_ref_id: project.ref_id(),
            big_plan_ref_id: None,
            suggested_date: SuggestedDate::default(),
        },
    )
    .expect("Failed to create inbox task")
}

fn load<T>(env: &UseCaseEnv, ref_id: EntityId) -> T
where
    T: SqliteRecord,
    for<'c> SqliteEntityRepository<'c, T>: LeafEntityRepository<T>,
    T: LeafEntity,
{
    env.storage
        .read_view(|view| view.repository::<T>().load_by_id(ref_id, true))
        .expect("Failed to load entity")
}

fn generate_periodic(env: &UseCaseEnv, today: &str) -> PeriodicSummary {
    env.run_logged_in_mutation(&GeneratePeriodic, GeneratePeriodicArgs { today: date(today) })
        .expect("Failed to generate journals and plans")
}

fn time_plans(env: &UseCaseEnv) -> Vec<TimePlan> {
    let ws = workspace_ref_id(env);
    env.storage
        .read_view(|view| {
            let domain = view.repository::<TimePlanDomain>().load_by_parent(ws)?;
            view.repository::<TimePlan>()
                .find_all_with_filters(domain.ref_id(), &EntityFilter::live())
        })
        .expect("Failed to list time plans")
}

fn weekly_journal(env: &UseCaseEnv, on: &str) -> UseCaseResult<Journal> {
    env.run_logged_in_mutation(
        &CreateJournal,
        CreateJournalArgs {
            right_now: date(on),
            period: RecurringTaskPeriod::Weekly,
        },
    )
}

speculate! {
    before {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let env = logged_in_env(&dir);
    }

    describe "sessions" {
        it "requires a principal for logged-in use cases" {
            let anonymous = fresh_env(&dir);
            let err = anonymous
                .run_logged_in_readonly(&FindProjects, FindProjectsArgs::default())
                .expect_err("must require login");
            assert!(matches!(err, UseCaseError::AuthRequired(_)));
            assert_eq!(err.exit_code(), 2);
        }

        it "rejects an expired principal" {
            let mut principal = env.principal.expect("logged in");
            principal.expires_at = Timestamp::from_raw("2020-01-01T00:00:00Z").expect("valid timestamp");
            let expired = env.with_principal(Some(principal));
            let err = expired
                .run_logged_in_readonly(&FindProjects, FindProjectsArgs::default())
                .expect_err("must reject expired session");
            assert!(matches!(err, UseCaseError::AuthRequired(_)));
        }

        it "refuses a second workspace in the same database" {
            let err = env
                .run_mutation(
                    &InitWorkspace,
                    InitWorkspaceArgs {
                        user_email: EmailAddress::from_raw("bob@example.com").expect("valid email"),
                        user_name: name("Bob"),
                        password: "hunter22hunter".to_string(),
                        workspace_name: name("Other"),
                        feature_flags: FeatureFlags::default(),
                    },
                )
                .expect_err("second init must fail");
            assert!(matches!(err, UseCaseError::Conflict(_)));
            assert_eq!(err.exit_code(), 4);
        }

        it "gates use cases behind workspace features" {
            env.run_logged_in_mutation(
                &UpdateFeatureFlags,
                UpdateFeatureFlagsArgs { changes: vec![(WorkspaceFeature::Journals, false)] },
            )
            .expect("Failed to update flags");

            let err = weekly_journal(&env, "2024-03-06").expect_err("journals are disabled");
            assert!(matches!(err, UseCaseError::FeatureUnavailable(WorkspaceFeature::Journals)));
            assert_eq!(err.exit_code(), 1);
        }
    }

    describe "journals" {
        it "allows one live journal per period instance" {
            let first = weekly_journal(&env, "2024-03-06").expect("first journal");
            assert_eq!(first.timeline().as_str(), "2024-W10");
            assert_eq!(first.source(), JournalSource::User);

            let err = weekly_journal(&env, "2024-03-08").expect_err("same week must conflict");
            match &err {
                UseCaseError::JournalExists { period, timeline } => {
                    assert_eq!(*period, RecurringTaskPeriod::Weekly);
                    assert_eq!(timeline.as_str(), "2024-W10");
                }
                other => panic!("unexpected error: {other:?}"),
            }
            assert_eq!(err.exit_code(), 4);

            env.run_logged_in_mutation(&ArchiveJournal, ArchiveJournalArgs { ref_id: first.ref_id() })
                .expect("Failed to archive journal");
            let second = weekly_journal(&env, "2024-03-08").expect("archived journal frees the slot");
            assert_ne!(second.ref_id(), first.ref_id());
        }

        it "keeps generated journals out of user hands" {
            generate_periodic(&env, "2024-03-06");
            let generated = env
                .run_logged_in_readonly(&FindJournals, FindJournalsArgs::default())
                .expect("Failed to find journals")
                .pop()
                .expect("a generated journal");
            assert_eq!(generated.source(), JournalSource::Generated);

            let err = env
                .run_logged_in_mutation(
                    &UpdateJournal,
                    UpdateJournalArgs {
                        ref_id: generated.ref_id(),
                        name: Some(name("Mine now")),
                        time_config: None,
                    },
                )
                .expect_err("generated journals are immutable");
            assert!(matches!(err, UseCaseError::ImmutableSource(_)));
            assert_eq!(err.exit_code(), 1);
            let unchanged: Journal = load(&env, generated.ref_id());
            assert_eq!(unchanged.name(), generated.name());

            let user_journal = env
                .run_logged_in_mutation(
                    &CreateJournal,
                    CreateJournalArgs { right_now: date("2024-03-06"), period: RecurringTaskPeriod::Monthly },
                )
                .expect("Failed to create user journal");
            let renamed = env
                .run_logged_in_mutation(
                    &UpdateJournal,
                    UpdateJournalArgs {
                        ref_id: user_journal.ref_id(),
                        name: Some(name("March thoughts")),
                        time_config: None,
                    },
                )
                .expect("user journals can be renamed");
            assert_eq!(renamed.name().as_str(), "March thoughts");
        }

        it "lists journals newest first" {
            weekly_journal(&env, "2024-03-06").expect("journal");
            weekly_journal(&env, "2024-03-20").expect("journal");
            weekly_journal(&env, "2024-03-13").expect("journal");
            let found = env
                .run_logged_in_readonly(&FindJournals, FindJournalsArgs { include_archived: false, period: None })
                .expect("Failed to find journals");
            let weeks: Vec<&str> = found.iter().map(|j| j.timeline().as_str()).collect();
            assert_eq!(weeks, vec!["2024-W12", "2024-W11", "2024-W10"]);
        }
    }

    describe "habits" {
        it "spreads generated tasks over the period without overlap" {
            let project = create_project(&env, "health");
            let schedule = HabitSchedule::new(
                RecurringTaskPeriod::Weekly,
                HabitRepeatsStrategy::SpreadOutNoOverlap,
                3,
            )
            .expect("valid schedule");
            let habit = create_habit(&env, &project, schedule);

            let summary = env
                .run_logged_in_mutation(
                    &GenerateHabitTasks,
                    GenerateHabitTasksArgs { today: date("2024-03-06"), habit_ref_ids: None },
                )
                .expect("Failed to generate");
            assert_eq!(summary.created, 3);

            let page = env
                .run_logged_in_readonly(
                    &FindInboxTasks,
                    FindInboxTasksArgs {
                        sources: Some(vec![InboxTaskSource::Habit]),
                        include_archived: false,
                        after: None,
                        limit: None,
                    },
                )
                .expect("Failed to find tasks");
            let dates: Vec<(Option<ADate>, Option<ADate>)> = page
                .tasks
                .iter()
                .map(|t| (t.suggested_date().actionable_date, t.suggested_date().due_date))
                .collect();
            assert_eq!(
                dates,
                vec![
                    (Some(date("2024-03-04")), Some(date("2024-03-06"))),
                    (Some(date("2024-03-07")), Some(date("2024-03-08"))),
                    (Some(date("2024-03-09")), Some(date("2024-03-10"))),
                ]
            );
            assert!(page.tasks.iter().all(|t| t.habit_ref_id() == Some(habit.ref_id())));
            assert!(page.tasks.iter().all(|t| t.status() == InboxTaskStatus::Recurring));
            assert_eq!(page.tasks[1].name().as_str(), "Stretch [2/3]");
        }

        it "regenerates without duplicating tasks" {
            let project = create_project(&env, "health");
            let schedule = HabitSchedule::new(RecurringTaskPeriod::Daily, HabitRepeatsStrategy::AllSame, 2)
                .expect("valid schedule");
            create_habit(&env, &project, schedule);
            let args = || GenerateHabitTasksArgs { today: date("2024-03-06"), habit_ref_ids: None };

            env.run_logged_in_mutation(&GenerateHabitTasks, args()).expect("first run");
            let again = env.run_logged_in_mutation(&GenerateHabitTasks, args()).expect("second run");
            assert_eq!(again.created, 0);
            assert_eq!(again.unchanged, 2);
        }

        it "skips suspended habits" {
            let project = create_project(&env, "health");
            let schedule = HabitSchedule::new(RecurringTaskPeriod::Daily, HabitRepeatsStrategy::AllSame, 1)
                .expect("valid schedule");
            let habit = create_habit(&env, &project, schedule);
            env.run_logged_in_mutation(
                &UpdateHabit,
                UpdateHabitArgs {
                    ref_id: habit.ref_id(),
                    name: None,
                    schedule: None,
                    project_ref_id: None,
                    suspended: Some(true),
                },
            )
            .expect("Failed to suspend");

            let summary = env
                .run_logged_in_mutation(
                    &GenerateHabitTasks,
                    GenerateHabitTasksArgs { today: date("2024-03-06"), habit_ref_ids: None },
                )
                .expect("Failed to generate");
            assert_eq!(summary.habits, 0);
            assert_eq!(summary.created, 0);
        }

        it "locks the definition of generated tasks but not their status" {
            let project = create_project(&env, "health");
            let schedule = HabitSchedule::new(RecurringTaskPeriod::Daily, HabitRepeatsStrategy::AllSame, 1)
                .expect("valid schedule");
            let habit = create_habit(&env, &project, schedule);
            env.run_logged_in_mutation(
                &GenerateHabitTasks,
                GenerateHabitTasksArgs { today: date("2024-03-06"), habit_ref_ids: Some(vec![habit.ref_id()]) },
            )
            .expect("Failed to generate");
            let task = env
                .run_logged_in_readonly(&FindInboxTasks, FindInboxTasksArgs::default())
                .expect("Failed to find tasks")
                .tasks
                .remove(0);

            let err = env
                .run_logged_in_mutation(
                    &UpdateInboxTask,
                    UpdateInboxTaskArgs {
                        ref_id: task.ref_id(),
                        name: Some(name("Renamed")),
                        status: None,
                        project_ref_id: None,
                        suggested_date: None,
                    },
                )
                .expect_err("habit task names belong to the habit");
            assert!(matches!(err, UseCaseError::ImmutableSource(_)));

            let done = env
                .run_logged_in_mutation(
                    &UpdateInboxTask,
                    UpdateInboxTaskArgs {
                        ref_id: task.ref_id(),
                        name: None,
                        status: Some(InboxTaskStatus::Done),
                        project_ref_id: None,
                        suggested_date: None,
                    },
                )
                .expect("status moves are allowed");
            assert_eq!(done.status(), InboxTaskStatus::Done);
            assert!(done.completed_time().is_some());
        }
    }

    describe "projects" {
        it "archives habits with the project and records a gc archival" {
            let project = create_project(&env, "work");
            let schedule = HabitSchedule::new(RecurringTaskPeriod::Weekly, HabitRepeatsStrategy::AllSame, 1)
                .expect("valid schedule");
            let first = create_habit(&env, &project, schedule);
            let second = create_habit(&env, &project, schedule);

            let output = env
                .run_logged_in_mutation(
                    &ArchiveProject,
                    ArchiveProjectArgs { ref_id: project.ref_id(), reason: ArchivalReason::Gc },
                )
                .expect("Failed to archive project");

            let archived_time = output.project.core().archived_time();
            assert!(archived_time.is_some());
            for habit_id in [first.ref_id(), second.ref_id()] {
                let habit: Habit = load(&env, habit_id);
                assert!(habit.is_archived());
                assert_eq!(habit.core().archival_reason(), Some(ArchivalReason::Gc));
                assert_eq!(habit.core().archived_time(), archived_time);
            }

            let entry = output.gc_log_entry.expect("gc archival is logged");
            assert_eq!(entry.archival_reason(), ArchivalReason::Gc);
            assert_eq!(entry.entity_counts().get(&EntityKind::Project), Some(&1));
            assert_eq!(entry.entity_counts().get(&EntityKind::Habit), Some(&2));

            let tail = env
                .run_logged_in_readonly(&GcLogTail, GcLogTailArgs::default())
                .expect("Failed to read gc log");
            assert_eq!(tail.len(), 1);
            assert_eq!(tail[0].ref_id(), entry.ref_id());
        }

        it "archives for the user without a log entry" {
            let project = create_project(&env, "work");
            let task = create_task(&env, &project, "Write report");
            let output = env
                .run_logged_in_mutation(
                    &ArchiveProject,
                    ArchiveProjectArgs { ref_id: project.ref_id(), reason: ArchivalReason::User },
                )
                .expect("Failed to archive project");
            assert!(output.gc_log_entry.is_none());
            let task: InboxTask = load(&env, task.ref_id());
            assert_eq!(task.core().archival_reason(), Some(ArchivalReason::User));
        }

        it "does not archive the same project twice" {
            let project = create_project(&env, "work");
            let args = || ArchiveProjectArgs { ref_id: project.ref_id(), reason: ArchivalReason::User };
            env.run_logged_in_mutation(&ArchiveProject, args()).expect("first archival");
            let err = env
                .run_logged_in_mutation(&ArchiveProject, args())
                .expect_err("archived projects are not found");
            assert!(matches!(err, UseCaseError::NotFound(_)));
            assert_eq!(err.exit_code(), 3);
        }

        it "rejects sync as an archival reason" {
            let project = create_project(&env, "work");
            let err = env
                .run_logged_in_mutation(
                    &ArchiveProject,
                    ArchiveProjectArgs { ref_id: project.ref_id(), reason: ArchivalReason::Sync },
                )
                .expect_err("sync is not a project archival reason");
            assert!(matches!(err, UseCaseError::Validation(_)));
        }

        it "finds projects by key" {
            create_project(&env, "work");
            create_project(&env, "home");
            let found = env
                .run_logged_in_readonly(
                    &FindProjects,
                    FindProjectsArgs {
                        include_archived: false,
                        keys: Some(vec![EntityKey::from_raw("home").expect("valid key")]),
                    },
                )
                .expect("Failed to find projects");
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].key().as_str(), "home");
        }
    }

    describe "inbox tasks" {
        it "reads legacy not-started rows as accepted" {
            let project = create_project(&env, "work");
            let task = create_task(&env, &project, "Old task");
            env.storage
                .unit_of_work(|uow| {
                    uow.sqlite().execute(
                        "UPDATE inbox_task SET status = 'not-started' WHERE ref_id = ?1",
                        [task.ref_id().as_i64()],
                    )?;
                    Ok::<_, StoreError>(())
                })
                .expect("Failed to write legacy status");

            let loaded: InboxTask = load(&env, task.ref_id());
            assert_eq!(loaded.status(), InboxTaskStatus::Accepted);
        }

        it "rejects a big plan from another project and writes nothing" {
            let work = create_project(&env, "work");
            let home = create_project(&env, "home");
            let plan = env
                .run_logged_in_mutation(
                    &CreateBigPlan,
                    CreateBigPlanArgs {
                        name: name("Move house"),
                        project_ref_id: home.ref_id(),
                        suggested_date: SuggestedDate::default(),
                    },
                )
                .expect("Failed to create big plan");

            let err = env
                .run_logged_in_mutation(
                    &CreateInboxTask,
                    CreateInboxTaskArgs {
                        name: name("Pack boxes"),
                        project_ref_id: work.ref_id(),
                        big_plan_ref_id: Some(plan.ref_id()),
                        suggested_date: SuggestedDate::default(),
                    },
                )
                .expect_err("big plan belongs to another project");
            assert!(matches!(err, UseCaseError::Validation(_)));

            let page = env
                .run_logged_in_readonly(&FindInboxTasks, FindInboxTasksArgs::default())
                .expect("Failed to find tasks");
            assert!(page.tasks.is_empty());
        }

        it "pages through tasks in creation order" {
            let project = create_project(&env, "work");
            let created: Vec<EntityId> = ["One", "Two", "Three"]
                .iter()
                .map(|n| create_task(&env, &project, n).ref_id())
                .collect();

            let first = env
                .run_logged_in_readonly(
                    &FindInboxTasks,
                    FindInboxTasksArgs { limit: Some(2), ..FindInboxTasksArgs::default() },
                )
                .expect("Failed to read first page");
            assert_eq!(first.tasks.len(), 2);
            let next = first.next.expect("a full page has a cursor");

            let second = env
                .run_logged_in_readonly(
                    &FindInboxTasks,
                    FindInboxTasksArgs { after: Some(next), limit: Some(2), ..FindInboxTasksArgs::default() },
                )
                .expect("Failed to read second page");
            assert_eq!(second.tasks.len(), 1);
            assert!(second.next.is_none());

            let seen: Vec<EntityId> = first.tasks.iter().chain(&second.tasks).map(|t| t.ref_id()).collect();
            assert_eq!(seen, created);
        }

        it "counts tasks by status in the report" {
            let project = create_project(&env, "work");
            create_task(&env, &project, "One");
            let done = create_task(&env, &project, "Two");
            env.run_logged_in_mutation(
                &UpdateInboxTask,
                UpdateInboxTaskArgs {
                    ref_id: done.ref_id(),
                    name: None,
                    status: Some(InboxTaskStatus::Done),
                    project_ref_id: None,
                    suggested_date: None,
                },
            )
            .expect("Failed to complete task");

            let report = env
                .run_logged_in_readonly(
                    &InboxTaskReport,
                    InboxTaskReportArgs {
                        breakdown: ReportBreakdown::Projects,
                        period: RecurringTaskPeriod::Weekly,
                        include_archived: false,
                    },
                )
                .expect("Failed to build report");
            assert_eq!(report.total, 2);
            assert_eq!(report.groups.len(), 1);
            let group = &report.groups[0];
            assert_eq!(group.label, "work");
            assert_eq!(group.by_status.get(&InboxTaskStatus::Accepted), Some(&1));
            assert_eq!(group.by_status.get(&InboxTaskStatus::Done), Some(&1));
        }
    }

    describe "notes" {
        it "attaches one note per non-user source entity" {
            let metric_entry = EntityId::from_i64(42);
            let args = || CreateNoteArgs {
                domain: NoteDomain::MetricEntry,
                source: NoteSource::MetricEntry,
                source_entity_ref_id: Some(metric_entry),
                name: name("Morning weight"),
                content: "72.4kg".to_string(),
            };
            env.run_logged_in_mutation(&CreateNote, args()).expect("first note");
            let err = env
                .run_logged_in_mutation(&CreateNote, args())
                .expect_err("second note for the same entry must conflict");
            assert!(matches!(err, UseCaseError::Conflict(_)));
            assert_eq!(err.exit_code(), 4);
        }

        it "allows many user notes on the same entity" {
            let metric_entry = EntityId::from_i64(42);
            for n in ["First", "Second"] {
                env.run_logged_in_mutation(
                    &CreateNote,
                    CreateNoteArgs {
                        domain: NoteDomain::MetricEntry,
                        source: NoteSource::User,
                        source_entity_ref_id: Some(metric_entry),
                        name: name(n),
                        content: String::new(),
                    },
                )
                .expect("user notes never conflict");
            }
        }

        it "needs a live inbox task to attach to" {
            let err = env
                .run_logged_in_mutation(
                    &CreateNote,
                    CreateNoteArgs {
                        domain: NoteDomain::InboxTask,
                        source: NoteSource::User,
                        source_entity_ref_id: Some(EntityId::from_i64(999)),
                        name: name("Dangling"),
                        content: String::new(),
                    },
                )
                .expect_err("missing task");
            assert!(matches!(err, UseCaseError::NotFound(_)));
        }
    }

    describe "periodic generation" {
        it "creates one generated entity per configured period" {
            let summary = generate_periodic(&env, "2024-03-06");
            assert_eq!(summary.journals_created, 1);
            assert_eq!(summary.time_plans_created, 2);

            let again = generate_periodic(&env, "2024-03-06");
            assert_eq!(again.journals_created + again.time_plans_created, 0);
            assert_eq!(again.existing, 3);

            let plans = time_plans(&env);
            assert_eq!(plans.len(), 2);
            assert!(plans.iter().all(|p| p.source() == TimePlanSource::Generated));

            let next_day = generate_periodic(&env, "2024-03-07");
            assert_eq!(next_day.time_plans_created, 1);
            assert_eq!(next_day.existing, 2);
        }

        it "follows updated periods" {
            let collection = env
                .run_logged_in_mutation(
                    &UpdateJournalPeriods,
                    UpdateJournalPeriodsArgs {
                        periods: [RecurringTaskPeriod::Monthly, RecurringTaskPeriod::Yearly].into(),
                    },
                )
                .expect("Failed to update periods");
            assert!(!collection.periods().contains(&RecurringTaskPeriod::Weekly));

            generate_periodic(&env, "2024-03-06");
            let journals = env
                .run_logged_in_readonly(&FindJournals, FindJournalsArgs::default())
                .expect("Failed to find journals");
            let mut timelines: Vec<&str> = journals.iter().map(|j| j.timeline().as_str()).collect();
            timelines.sort_unstable();
            assert_eq!(timelines, vec!["2024", "2024-03"]);
        }

        it "leaves a period instance that already has a user journal" {
            let own = weekly_journal(&env, "2024-03-05").expect("user journal");
            let summary = generate_periodic(&env, "2024-03-06");
            assert_eq!(summary.journals_created, 0);
            let journals = env
                .run_logged_in_readonly(&FindJournals, FindJournalsArgs::default())
                .expect("Failed to find journals");
            assert_eq!(journals.len(), 1);
            assert_eq!(journals[0].ref_id(), own.ref_id());
        }

        it "skips disabled features" {
            env.run_logged_in_mutation(
                &UpdateFeatureFlags,
                UpdateFeatureFlagsArgs { changes: vec![(WorkspaceFeature::TimePlans, false)] },
            )
            .expect("Failed to update flags");
            let summary = generate_periodic(&env, "2024-03-06");
            assert_eq!(summary.journals_created, 1);
            assert_eq!(summary.time_plans_created, 0);
        }
    }

    describe "time plans" {
        it "allows one live plan per period instance" {
            let args = || CreateTimePlanArgs { right_now: date("2024-03-06"), period: RecurringTaskPeriod::Daily };
            env.run_logged_in_mutation(&CreateTimePlan, args()).expect("first plan");
            let err = env
                .run_logged_in_mutation(&CreateTimePlan, args())
                .expect_err("duplicate plan");
            assert!(matches!(err, UseCaseError::Conflict(_)));
        }

        it "moves user plans but not generated ones" {
            let own = env
                .run_logged_in_mutation(
                    &CreateTimePlan,
                    CreateTimePlanArgs { right_now: date("2024-03-06"), period: RecurringTaskPeriod::Monthly },
                )
                .expect("user plan");
            let moved = env
                .run_logged_in_mutation(
                    &UpdateTimePlan,
                    UpdateTimePlanArgs {
                        ref_id: own.ref_id(),
                        right_now: date("2024-04-02"),
                        period: RecurringTaskPeriod::Monthly,
                    },
                )
                .expect("user plans can move");
            assert_eq!(moved.timeline().as_str(), "2024-04");

            generate_periodic(&env, "2024-03-06");
            let generated = time_plans(&env)
                .into_iter()
                .find(|p| p.source() == TimePlanSource::Generated)
                .expect("a generated plan");
            let err = env
                .run_logged_in_mutation(
                    &UpdateTimePlan,
                    UpdateTimePlanArgs {
                        ref_id: generated.ref_id(),
                        right_now: date("2024-05-01"),
                        period: RecurringTaskPeriod::Quarterly,
                    },
                )
                .expect_err("generated plans are immutable");
            assert!(matches!(err, UseCaseError::ImmutableSource(_)));
        }

        it "refuses to move a plan onto a taken period instance" {
            let create = |on: &str| {
                env.run_logged_in_mutation(
                    &CreateTimePlan,
                    CreateTimePlanArgs { right_now: date(on), period: RecurringTaskPeriod::Daily },
                )
                .expect("user plan")
            };
            create("2024-03-06");
            let other = create("2024-03-07");
            let err = env
                .run_logged_in_mutation(
                    &UpdateTimePlan,
                    UpdateTimePlanArgs {
                        ref_id: other.ref_id(),
                        right_now: date("2024-03-06"),
                        period: RecurringTaskPeriod::Daily,
                    },
                )
                .expect_err("slot taken");
            assert!(matches!(err, UseCaseError::Conflict(_)));
        }

        it "tracks how planned work is going" {
            let project = create_project(&env, "garden");
            let task = create_task(&env, &project, "Plant tulips");
            let plan = env
                .run_logged_in_mutation(
                    &CreateTimePlan,
                    CreateTimePlanArgs { right_now: date("2024-03-06"), period: RecurringTaskPeriod::Weekly },
                )
                .expect("plan");
            let activity = env
                .run_logged_in_mutation(
                    &CreateTimePlanActivity,
                    CreateTimePlanActivityArgs {
                        time_plan_ref_id: plan.ref_id(),
                        target: TimePlanActivityTarget::InboxTask,
                        target_ref_id: task.ref_id(),
                        feasability: TimePlanActivityFeasability::NiceToHave,
                    },
                )
                .expect("activity");
            let updated = env
                .run_logged_in_mutation(
                    &UpdateTimePlanActivity,
                    UpdateTimePlanActivityArgs {
                        ref_id: activity.ref_id(),
                        feasability: Some(TimePlanActivityFeasability::MustDo),
                        doneness: Some(TimePlanActivityDoneness::Working),
                    },
                )
                .expect("Failed to update activity");
            assert_eq!(updated.feasability(), TimePlanActivityFeasability::MustDo);
            assert_eq!(updated.doneness(), TimePlanActivityDoneness::Working);
        }
    }

    describe "cancellation" {
        it "rolls back a mutation that was cancelled" {
            let cancellation = Cancellation::default();
            cancellation.cancel();
            let cancelled = env.with_cancellation(cancellation);
            let err = cancelled
                .run_logged_in_mutation(
                    &CreateProject,
                    CreateProjectArgs {
                        key: EntityKey::from_raw("work").expect("valid key"),
                        name: name("Work"),
                    },
                )
                .expect_err("cancelled before commit");
            assert!(matches!(err, UseCaseError::Timeout));
            assert_eq!(err.exit_code(), 5);

            let found = cancelled
                .run_logged_in_readonly(&FindProjects, FindProjectsArgs::default())
                .expect("reads still work");
            assert!(found.is_empty());
        }
    }
}
