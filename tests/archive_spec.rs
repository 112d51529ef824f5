use lifeplan::bootstrap::BootstrapFiles;
use lifeplan::db::*;
use lifeplan::models::*;
use lifeplan::services::{ArchiveCounts, ArchiveService, FeedEvent};
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
                user_email: EmailAddress::from_raw("lin@example.com").expect("valid email"),
                user_name: name("Lin"),
                password: "archive-me-please".to_string(),
                workspace_name: name("Studio"),
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

fn create_project(env: &UseCaseEnv) -> Project {
    env.run_logged_in_mutation(
        &CreateProject,
        CreateProjectArgs {
            key: EntityKey::from_raw("studio").expect("valid key"),
            name: name("Studio work"),
        },
    )
    .expect("Failed to create project")
}

fn create_task(env: &UseCaseEnv, project: &Project, big_plan: Option<&BigPlan>) -> InboxTask {
    env.run_logged_in_mutation(
        &CreateInboxTask,
        CreateInboxTaskArgs {
            name: name("Mix the album"),
            project_ref_id: project.ref_id(),
            big_plan_ref_id: big_plan.map(|p| p.ref_id()),
            suggested_date: SuggestedDate::default(),
        },
    )
    .expect("Failed to create task")
}

/// A big plan with one task under it, both planned into a weekly time plan,
/// and a note on the task.
struct PlannedWork {
    big_plan: BigPlan,
    task: InboxTask,
    note: Note,
    plan_activity: TimePlanActivity,
    task_activity: TimePlanActivity,
}

fn planned_work(env: &UseCaseEnv) -> PlannedWork {
    let project = create_project(env);
    let big_plan = env
        .run_logged_in_mutation(
            &CreateBigPlan,
            CreateBigPlanArgs {
                name: name("Tour"),
                project_ref_id: project.ref_id(),
                suggested_date: SuggestedDate::default(),
            },
        )
        .expect("Failed to create big plan");
    let task = create_task(env, &project, Some(&big_plan));
    let note = env
        .run_logged_in_mutation(
            &CreateNote,
            CreateNoteArgs {
                domain: NoteDomain::InboxTask,
                source: NoteSource::InboxTask,
                source_entity_ref_id: Some(task.ref_id()),
                name: name("Setlist"),
                content: "opener first".to_string(),
            },
        )
        .expect("Failed to create note");
    let time_plan = env
        .run_logged_in_mutation(
            &CreateTimePlan,
            CreateTimePlanArgs { right_now: date("2024-03-06"), period: RecurringTaskPeriod::Weekly },
        )
        .expect("Failed to create time plan");
    let activity = |target: TimePlanActivityTarget, target_ref_id: EntityId| {
        env.run_logged_in_mutation(
            &CreateTimePlanActivity,
            CreateTimePlanActivityArgs {
                time_plan_ref_id: time_plan.ref_id(),
                target,
                target_ref_id,
                feasability: TimePlanActivityFeasability::MustDo,
            },
        )
        .expect("Failed to plan")
    };
    let plan_activity = activity(TimePlanActivityTarget::BigPlan, big_plan.ref_id());
    let task_activity = activity(TimePlanActivityTarget::InboxTask, task.ref_id());
    PlannedWork {
        big_plan,
        task,
        note,
        plan_activity,
        task_activity,
    }
}

fn archive_big_plan(env: &UseCaseEnv, big_plan: &BigPlan, limit: Option<u32>) -> ArchiveCounts {
    env.storage
        .unit_of_work(|uow| {
            let big_plan = uow.repository::<BigPlan>().load_by_id(big_plan.ref_id(), false)?;
            let mut archiver =
                ArchiveService::new(uow, DomainContext::now(EventSource::Cli), ArchivalReason::User);
            if let Some(limit) = limit {
                archiver = archiver.with_limit(limit);
            }
            archiver.archive_big_plan(big_plan)?;
            Ok::<_, StoreError>(archiver.into_counts())
        })
        .expect("Failed to archive big plan")
}

fn feed_event(uid: &str, title: &str, day: &str) -> FeedEvent {
    FeedEvent {
        uid: uid.to_string(),
        name: name(title),
        start_date: date(day),
        end_date: date(day),
    }
}

fn events_of(env: &UseCaseEnv, stream: &ScheduleStream) -> Vec<ScheduleEvent> {
    env.storage
        .read_view(|view| {
            view.repository::<ScheduleEvent>()
                .find_all_with_filters(stream.ref_id(), &EntityFilter::all())
        })
        .expect("Failed to list events")
}

fn load<T>(env: &UseCaseEnv, ref_id: EntityId) -> T
where
    T: SqliteRecord + LeafEntity,
    for<'c> SqliteEntityRepository<'c, T>: LeafEntityRepository<T>,
{
    env.storage
        .read_view(|view| view.repository::<T>().load_by_id(ref_id, true))
        .expect("Failed to load entity")
}

speculate! {
    before {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let env = logged_in_env(&dir);
    }

    describe "workspace archival" {
        it "archives every trunk and what hangs off it" {
            let project = create_project(&env);
            let task = create_task(&env, &project, None);
            env.run_logged_in_mutation(
                &CreateJournal,
                CreateJournalArgs { right_now: date("2024-03-06"), period: RecurringTaskPeriod::Weekly },
            )
            .expect("Failed to create journal");
            let list = env
                .run_logged_in_mutation(
                    &CreateSmartList,
                    CreateSmartListArgs {
                        key: EntityKey::from_raw("books").expect("valid key"),
                        name: name("Books"),
                    },
                )
                .expect("Failed to create smart list");
            env.run_logged_in_mutation(
                &CreateSmartListItem,
                CreateSmartListItemArgs { smart_list_ref_id: list.ref_id(), name: name("Dune") },
            )
            .expect("Failed to create item");

            let ws = env.principal.expect("logged in").workspace_ref_id;
            let counts = env
                .storage
                .unit_of_work(|uow| {
                    let workspace = uow.repository::<Workspace>().load_by_id(ws, false)?;
                    let mut archiver =
                        ArchiveService::new(uow, DomainContext::now(EventSource::Cli), ArchivalReason::User);
                    archiver.archive_workspace(workspace)?;
                    Ok::<_, StoreError>(archiver.into_counts())
                })
                .expect("Failed to archive workspace");

            for kind in [
                EntityKind::Workspace,
                EntityKind::ProjectCollection,
                EntityKind::GcLog,
                EntityKind::Project,
                EntityKind::InboxTask,
                EntityKind::Journal,
                EntityKind::SmartList,
                EntityKind::SmartListItem,
            ] {
                assert_eq!(counts.get(&kind), Some(&1), "{kind}");
            }
            let task: InboxTask = load(&env, task.ref_id());
            assert!(task.is_archived());

            let err = env
                .run_logged_in_readonly(&FindProjects, FindProjectsArgs::default())
                .expect_err("the session's workspace is gone");
            assert!(matches!(err, UseCaseError::AuthDenied(_)));
        }
    }

    describe "inbox task archival" {
        it "takes attached notes and plan activities along" {
            let project = create_project(&env);
            let task = create_task(&env, &project, None);
            let note = env
                .run_logged_in_mutation(
                    &CreateNote,
                    CreateNoteArgs {
                        domain: NoteDomain::InboxTask,
                        source: NoteSource::InboxTask,
                        source_entity_ref_id: Some(task.ref_id()),
                        name: name("Mixing notes"),
                        content: "more bass".to_string(),
                    },
                )
                .expect("Failed to create note");
            let plan = env
                .run_logged_in_mutation(
                    &CreateTimePlan,
                    CreateTimePlanArgs { right_now: date("2024-03-06"), period: RecurringTaskPeriod::Weekly },
                )
                .expect("Failed to create time plan");
            let activity = env
                .run_logged_in_mutation(
                    &CreateTimePlanActivity,
                    CreateTimePlanActivityArgs {
                        time_plan_ref_id: plan.ref_id(),
                        target: TimePlanActivityTarget::InboxTask,
                        target_ref_id: task.ref_id(),
                        feasability: TimePlanActivityFeasability::MustDo,
                    },
                )
                .expect("Failed to plan task");
            assert_eq!(activity.target(), TimePlanActivityTarget::InboxTask);

            env.run_logged_in_mutation(&ArchiveInboxTask, ArchiveInboxTaskArgs { ref_id: task.ref_id() })
                .expect("Failed to archive task");

            let note: Note = load(&env, note.ref_id());
            let activity: TimePlanActivity = load(&env, activity.ref_id());
            assert!(note.is_archived());
            assert!(activity.is_archived());
            assert_eq!(activity.core().archival_reason(), Some(ArchivalReason::User));
        }

        it "refuses to plan an archived task" {
            let project = create_project(&env);
            let task = create_task(&env, &project, None);
            let plan = env
                .run_logged_in_mutation(
                    &CreateTimePlan,
                    CreateTimePlanArgs { right_now: date("2024-03-06"), period: RecurringTaskPeriod::Daily },
                )
                .expect("Failed to create time plan");
            env.run_logged_in_mutation(&ArchiveInboxTask, ArchiveInboxTaskArgs { ref_id: task.ref_id() })
                .expect("Failed to archive task");

            let err = env
                .run_logged_in_mutation(
                    &CreateTimePlanActivity,
                    CreateTimePlanActivityArgs {
                        time_plan_ref_id: plan.ref_id(),
                        target: TimePlanActivityTarget::InboxTask,
                        target_ref_id: task.ref_id(),
                        feasability: TimePlanActivityFeasability::Stretch,
                    },
                )
                .expect_err("archived target");
            assert!(matches!(err, UseCaseError::NotFound(_)));
        }
    }

    describe "big plan archival" {
        it "takes its tasks and every activity along at one time" {
            let work = planned_work(&env);
            let counts = archive_big_plan(&env, &work.big_plan, None);
            assert_eq!(counts.get(&EntityKind::BigPlan), Some(&1));
            assert_eq!(counts.get(&EntityKind::InboxTask), Some(&1));
            assert_eq!(counts.get(&EntityKind::Note), Some(&1));
            assert_eq!(counts.get(&EntityKind::TimePlanActivity), Some(&2));

            let big_plan: BigPlan = load(&env, work.big_plan.ref_id());
            let stamp = big_plan.core().archived_time();
            assert!(stamp.is_some());
            let cores = [
                load::<InboxTask>(&env, work.task.ref_id()).core().clone(),
                load::<Note>(&env, work.note.ref_id()).core().clone(),
                load::<TimePlanActivity>(&env, work.plan_activity.ref_id()).core().clone(),
                load::<TimePlanActivity>(&env, work.task_activity.ref_id()).core().clone(),
            ];
            for core in cores {
                assert!(core.archived());
                assert_eq!(core.archived_time(), stamp);
                assert_eq!(core.archival_reason(), Some(ArchivalReason::User));
            }
        }

        it "stops at the archival limit" {
            let work = planned_work(&env);
            let counts = archive_big_plan(&env, &work.big_plan, Some(2));
            assert_eq!(counts.values().sum::<u32>(), 2);
            assert!(load::<BigPlan>(&env, work.big_plan.ref_id()).is_archived());
            assert!(load::<InboxTask>(&env, work.task.ref_id()).is_archived());
            assert!(!load::<Note>(&env, work.note.ref_id()).is_archived());
            assert!(!load::<TimePlanActivity>(&env, work.plan_activity.ref_id()).is_archived());
        }
    }

    describe "big plans" {
        it "stamps completion and archives its tasks with the project" {
            let project = create_project(&env);
            let plan = env
                .run_logged_in_mutation(
                    &CreateBigPlan,
                    CreateBigPlanArgs {
                        name: name("Release the album"),
                        project_ref_id: project.ref_id(),
                        suggested_date: SuggestedDate::default(),
                    },
                )
                .expect("Failed to create big plan");
            let task = create_task(&env, &project, Some(&plan));
            assert_eq!(task.big_plan_ref_id(), Some(plan.ref_id()));

            let done = env
                .run_logged_in_mutation(
                    &UpdateBigPlanStatus,
                    UpdateBigPlanStatusArgs { ref_id: plan.ref_id(), status: BigPlanStatus::Done },
                )
                .expect("Failed to complete big plan");
            assert!(done.completed_time().is_some());

            let output = env
                .run_logged_in_mutation(
                    &ArchiveProject,
                    ArchiveProjectArgs { ref_id: project.ref_id(), reason: ArchivalReason::User },
                )
                .expect("Failed to archive project");
            assert_eq!(output.archived.get(&EntityKind::BigPlan), Some(&1));
            assert_eq!(output.archived.get(&EntityKind::InboxTask), Some(&1));
        }
    }

    describe "schedule sync" {
        before {
            let stream = env
                .run_logged_in_mutation(
                    &CreateScheduleStream,
                    CreateScheduleStreamArgs {
                        name: name("Gigs"),
                        source_ical_url: Some("https://example.com/gigs.ics".to_string()),
                    },
                )
                .expect("Failed to create stream");
        }

        it "creates listed events" {
            let summary = env
                .run_logged_in_mutation(
                    &SyncScheduleStream,
                    SyncScheduleStreamArgs {
                        ref_id: stream.ref_id(),
                        events: vec![
                            feed_event("a@gigs", "Berlin", "2024-05-01"),
                            feed_event("b@gigs", "Paris", "2024-05-03"),
                        ],
                    },
                )
                .expect("Failed to sync");
            assert_eq!(summary.created, 2);
            assert_eq!(events_of(&env, &stream).len(), 2);
        }

        it "updates changed events and archives vanished ones" {
            let first = SyncScheduleStreamArgs {
                ref_id: stream.ref_id(),
                events: vec![
                    feed_event("a@gigs", "Berlin", "2024-05-01"),
                    feed_event("b@gigs", "Paris", "2024-05-03"),
                ],
            };
            env.run_logged_in_mutation(&SyncScheduleStream, first).expect("first sync");

            let summary = env
                .run_logged_in_mutation(
                    &SyncScheduleStream,
                    SyncScheduleStreamArgs {
                        ref_id: stream.ref_id(),
                        events: vec![feed_event("a@gigs", "Berlin (moved)", "2024-05-02")],
                    },
                )
                .expect("second sync");
            assert_eq!(summary.updated, 1);
            assert_eq!(summary.archived, 1);

            let events = events_of(&env, &stream);
            let paris = events
                .iter()
                .find(|e| e.external_uid() == Some("b@gigs"))
                .expect("archived event is kept");
            assert_eq!(paris.core().archival_reason(), Some(ArchivalReason::Sync));
            let berlin = events
                .iter()
                .find(|e| e.external_uid() == Some("a@gigs"))
                .expect("updated event");
            assert_eq!(berlin.start_date(), date("2024-05-02"));
            assert!(!berlin.is_archived());
        }

        it "leaves user streams alone" {
            let own = env
                .run_logged_in_mutation(
                    &CreateScheduleStream,
                    CreateScheduleStreamArgs { name: name("Rehearsals"), source_ical_url: None },
                )
                .expect("Failed to create user stream");
            let err = env
                .run_logged_in_mutation(
                    &SyncScheduleStream,
                    SyncScheduleStreamArgs { ref_id: own.ref_id(), events: Vec::new() },
                )
                .expect_err("user streams are not synced");
            assert!(matches!(err, UseCaseError::Validation(_)));
        }

        it "rejects a feed url that is not http" {
            let err = env
                .run_logged_in_mutation(
                    &CreateScheduleStream,
                    CreateScheduleStreamArgs {
                        name: name("Local"),
                        source_ical_url: Some("file:///tmp/gigs.ics".to_string()),
                    },
                )
                .expect_err("bad url");
            assert!(matches!(err, UseCaseError::Validation(_)));
        }
    }
}
