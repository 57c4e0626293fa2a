mod common;

use common::*;
use projectionist::config::ProjectionistConfig;
use projectionist::error::ProjectionistError;
use projectionist::handler::HandlerId;
use projectionist::policy::{HandlerOutcome, PassState};
use projectionist::registry::HandlerCatalog;
use projectionist::Projectionist;
use std::sync::Arc;
use std::sync::atomic::Ordering;

fn catching() -> Projectionist {
    Projectionist::new(ProjectionistConfig {
        catch_exceptions: true,
        ..Default::default()
    })
}

#[tokio::test]
async fn registration_is_idempotent_per_type() {
    let projectionist = Projectionist::default();
    projectionist
        .add_projector(BalanceProjector::default())
        .add_projector(BalanceProjector::default())
        .add_reactor(AuditReactor::default())
        .add_reactor_type::<AuditReactor>();

    assert_eq!(projectionist.projectors().len(), 1);
    assert_eq!(projectionist.reactors().len(), 1);

    // 重复注册保留首个实例
    let first = BalanceProjector::default();
    let balance = first.balance.clone();
    let projectionist = Projectionist::default();
    projectionist
        .add_projector(first)
        .add_projector(BalanceProjector::default());
    projectionist.handle(&money_added(42, 10)).await.unwrap();
    assert_eq!(balance.load(Ordering::SeqCst), 10);
}

#[tokio::test]
async fn add_event_handler_uses_declared_role() {
    let projectionist = Projectionist::default();
    projectionist
        .add_event_handler(AuditReactor::default())
        .add_event_handler(BalanceProjector::default());

    assert_eq!(
        projectionist.projectors()[0].id(),
        HandlerId::of::<BalanceProjector>()
    );
    assert_eq!(
        projectionist.reactors()[0].id(),
        HandlerId::of::<AuditReactor>()
    );
}

#[tokio::test]
async fn without_event_handlers_clears_or_filters() {
    let projectionist = Projectionist::default();
    projectionist
        .add_projector(BalanceProjector::default())
        .add_reactor(AuditReactor::default());

    projectionist.without_event_handlers(Some(&[HandlerId::of::<AuditReactor>()]));
    assert_eq!(projectionist.projectors().len(), 1);
    assert!(projectionist.reactors().is_empty());

    projectionist.add_reactor(AuditReactor::default());
    projectionist.without_event_handlers(None);
    assert!(projectionist.projectors().is_empty());
    assert!(projectionist.reactors().is_empty());
}

#[tokio::test]
async fn projectors_run_before_reactors_in_registration_order() {
    let audit = AuditReactor::default();
    let entries = audit.entries.clone();
    let projectionist = Projectionist::default();
    projectionist
        .add_reactor(audit)
        .add_projector(BalanceProjector::default())
        .add_projector(MisconfiguredProjector)
        .without_projectors(Some(&[HandlerId::of::<MisconfiguredProjector>()]));

    let report = projectionist.handle(&money_added(42, 5)).await.unwrap();
    let order: Vec<HandlerId> = report.outcomes().iter().map(|(id, _)| *id).collect();
    assert_eq!(
        order,
        vec![
            HandlerId::of::<BalanceProjector>(),
            HandlerId::of::<AuditReactor>()
        ]
    );
    assert_eq!(report.state(), PassState::Completed);
    assert_eq!(entries.lock().unwrap().as_slice(), ["MoneyAdded"]);
}

#[tokio::test]
async fn unmapped_event_is_skipped_without_error() {
    let projector = BalanceProjector::default();
    let calls = projector.calls.clone();
    let projectionist = Projectionist::default();
    projectionist
        .add_projector(projector)
        .add_projector(FailingProjector::default());

    let report = projectionist
        .handle(&stored(AccountEvent::AccountOpened { account_id: 42 }))
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(
        report
            .outcomes()
            .iter()
            .all(|(_, outcome)| *outcome == HandlerOutcome::Skipped)
    );
    assert!(!report.has_failures());
}

#[tokio::test]
async fn invalid_handler_errors_regardless_of_policy() {
    for projectionist in [Projectionist::default(), catching()] {
        let projector = BalanceProjector::default();
        let calls = projector.calls.clone();
        projectionist
            .add_projector(MisconfiguredProjector)
            .add_projector(projector);

        let err = projectionist.handle(&money_added(42, 1)).await.unwrap_err();
        assert!(matches!(
            err,
            ProjectionistError::InvalidEventHandler { ref method, .. } if method == "on_money_added"
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}

#[tokio::test]
async fn fail_fast_stops_the_pass() {
    let failing = FailingProjector::default();
    let hook_calls = failing.hook_calls.clone();
    let projector = BalanceProjector::default();
    let balance = projector.balance.clone();

    let projectionist = Projectionist::default();
    projectionist.add_projector(failing).add_projector(projector);

    let err = projectionist.handle(&money_added(42, 1000)).await.unwrap_err();
    match err {
        ProjectionistError::HandlerInvocation {
            handler,
            event_type,
            method,
            source,
        } => {
            assert_eq!(handler, "FailingProjector");
            assert_eq!(event_type, "MoneyAdded");
            assert_eq!(method, "on_money_added");
            assert_eq!(source.to_string(), "ledger unavailable");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(balance.load(Ordering::SeqCst), 0);
    assert_eq!(hook_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn catch_mode_calls_hook_once_and_continues() {
    let failing = FailingProjector::default();
    let hook_calls = failing.hook_calls.clone();
    let hook_errors = failing.hook_errors.clone();
    let projector = BalanceProjector::default();
    let balance = projector.balance.clone();

    let projectionist = catching();
    projectionist.add_projector(failing).add_projector(projector);

    let report = projectionist.handle(&money_added(42, 1000)).await.unwrap();

    assert_eq!(hook_calls.load(Ordering::SeqCst), 1);
    assert_eq!(hook_errors.lock().unwrap().as_slice(), ["ledger unavailable"]);
    assert_eq!(balance.load(Ordering::SeqCst), 1000);
    assert_eq!(report.state(), PassState::Completed);
    assert_eq!(
        report.failures().collect::<Vec<_>>(),
        vec![HandlerId::of::<FailingProjector>()]
    );
    assert_eq!(
        report.outcome_of(&HandlerId::of::<BalanceProjector>()),
        Some(&HandlerOutcome::Handled {
            method: "on_money_added".to_string()
        })
    );
}

#[tokio::test]
async fn removing_one_reactor_keeps_the_other() {
    let audit = AuditReactor::default();
    let entries = audit.entries.clone();
    let queue = RecordingQueue::default();
    let items = queue.items.clone();

    let projectionist = Projectionist::builder().queue(Arc::new(queue)).build();
    projectionist
        .add_reactor(NotificationReactor::default())
        .add_reactor(audit)
        .without_event_handler(&HandlerId::of::<NotificationReactor>());

    let reactors = projectionist.reactors();
    assert_eq!(reactors.len(), 1);
    assert_eq!(reactors[0].id(), HandlerId::of::<AuditReactor>());

    projectionist.handle(&money_added(42, 1)).await.unwrap();
    assert_eq!(entries.lock().unwrap().len(), 1);
    assert!(items.lock().unwrap().is_empty());
}

#[tokio::test]
async fn handle_many_stops_at_first_error() {
    let failing = FailingProjector::default();
    let projectionist = Projectionist::default();
    projectionist
        .add_projector(BalanceProjector::default())
        .add_projector(failing);

    let events = vec![
        stored(AccountEvent::MoneySubtracted {
            account_id: 42,
            amount: 3,
        }),
        money_added(42, 1),
        money_added(42, 2),
    ];
    let err = projectionist.handle_many(&events).await.unwrap_err();
    assert!(matches!(err, ProjectionistError::HandlerInvocation { .. }));

    projectionist.without_projectors(Some(&[HandlerId::of::<FailingProjector>()]));
    let reports = projectionist.handle_many(&events).await.unwrap();
    assert_eq!(reports.len(), 3);
}

#[tokio::test]
async fn bootstrap_registers_handlers_by_name() {
    let catalog = HandlerCatalog::new()
        .register::<BalanceProjector>()
        .register::<AuditReactor>();
    let config = ProjectionistConfig {
        projectors: vec!["BalanceProjector".to_string()],
        reactors: vec!["AuditReactor".to_string()],
        ..Default::default()
    };

    let projectionist = Projectionist::builder()
        .config(config)
        .catalog(catalog.clone())
        .build();
    projectionist.bootstrap().unwrap();
    assert_eq!(projectionist.projectors().len(), 1);
    assert_eq!(projectionist.reactors().len(), 1);

    let unknown = Projectionist::builder()
        .config(ProjectionistConfig {
            reactors: vec!["MissingReactor".to_string()],
            ..Default::default()
        })
        .catalog(catalog)
        .build();
    let err = unknown.bootstrap().unwrap_err();
    assert!(matches!(
        err,
        ProjectionistError::Resolution { ref name } if name == "MissingReactor"
    ));
}

#[tokio::test]
async fn resolution_errors_surface_in_catch_mode() {
    let projectionist = Projectionist::builder()
        .config(ProjectionistConfig {
            catch_exceptions: true,
            projectors: vec!["BalanceProjector".to_string()],
            reactors: vec!["MissingReactor".to_string()],
            ..Default::default()
        })
        .catalog(HandlerCatalog::new().register::<BalanceProjector>())
        .build();

    let err = projectionist.bootstrap().unwrap_err();
    assert!(matches!(
        err,
        ProjectionistError::Resolution { ref name } if name == "MissingReactor"
    ));

    let err = projectionist.add_projector_named("NoSuchProjector").unwrap_err();
    assert!(matches!(err, ProjectionistError::Resolution { .. }));
    assert_eq!(projectionist.projectors().len(), 1);
    assert!(projectionist.reactors().is_empty());
}
