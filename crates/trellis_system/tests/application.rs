//! Lifecycle tests for `Application`.

use std::sync::Arc;

use parking_lot::Mutex;
use trellis_system::application::{Application, ApplicationError};
use trellis_system::extension::{
    Extension, ExtensionError, ExtensionGroup, ExtensionGroupBuilder, Provides, Slot, Wants,
};

/// Records lifecycle calls in the order they happen.
#[derive(Default)]
struct EventLog {
    events: Mutex<Vec<String>>,
}

impl EventLog {
    fn push(&self, event: impl Into<String>) {
        self.events.lock().push(event.into());
    }

    fn take(&self) -> Vec<String> {
        core::mem::take(&mut *self.events.lock())
    }
}

/// Writes `<stage>:<name>` for every hook into the shared log.
struct Tracked {
    name: &'static str,
    log: Arc<EventLog>,
    fail_init: bool,
    fail_destroy: bool,
}

impl Tracked {
    fn new(name: &'static str, log: &Arc<EventLog>) -> Self {
        Self {
            name,
            log: Arc::clone(log),
            fail_init: false,
            fail_destroy: false,
        }
    }

    fn record(&self, stage: &str) {
        self.log.push(format!("{stage}:{}", self.name));
    }
}

macro_rules! tracked_extension {
    ($ty:ident, $name:literal $(, $field:ident: $target:ty)*) => {
        struct $ty {
            inner: Tracked,
            $($field: Slot<$target>,)*
        }

        impl $ty {
            fn new(log: &Arc<EventLog>) -> Self {
                Self {
                    inner: Tracked::new($name, log),
                    $($field: Slot::empty(),)*
                }
            }
        }

        impl Extension for $ty {
            fn wants<'a>(&'a self, _wants: &mut Wants<'a>) {
                $(_wants.extension(stringify!($field), &self.$field);)*
            }

            fn init(&self, _app: &mut Application) -> Result<(), ExtensionError> {
                self.inner.record("init");
                if self.inner.fail_init {
                    return Err(ExtensionError::failed($name, "init refused"));
                }
                Ok(())
            }

            fn post_init(&self, _app: &mut Application) -> Result<(), ExtensionError> {
                self.inner.record("post_init");
                Ok(())
            }

            fn destroy(&self, _app: &mut Application) -> Result<(), ExtensionError> {
                self.inner.record("destroy");
                if self.inner.fail_destroy {
                    return Err(ExtensionError::failed($name, "destroy refused"));
                }
                Ok(())
            }

            fn name(&self) -> &str {
                $name
            }
        }
    };
}

tracked_extension!(Store, "store");
tracked_extension!(Cache, "cache", store: Store);
tracked_extension!(Users, "users", store: Store, cache: Cache);

#[test]
fn hooks_run_in_dependency_order() {
    let log = Arc::new(EventLog::default());
    let mut app = Application::new();
    app.add_extensions(Users::new(&log))
        .add_extensions(Cache::new(&log))
        .add_extensions(Store::new(&log));

    app.finish().unwrap();
    assert_eq!(app.extension_names(), vec!["store", "cache", "users"]);
    assert_eq!(
        log.take(),
        vec![
            "init:store",
            "init:cache",
            "init:users",
            "post_init:store",
            "post_init:cache",
            "post_init:users",
        ]
    );

    app.shutdown().unwrap();
    assert_eq!(
        log.take(),
        vec!["destroy:users", "destroy:cache", "destroy:store"]
    );
}

#[test]
fn destroy_errors_do_not_stop_teardown() {
    let log = Arc::new(EventLog::default());
    let mut cache = Cache::new(&log);
    cache.inner.fail_destroy = true;

    let mut app = Application::new();
    app.add_extensions(Store::new(&log))
        .add_extensions(cache)
        .add_extensions(Users::new(&log));
    app.finish().unwrap();
    log.take();

    let err = app.shutdown().unwrap_err();
    assert!(matches!(err, ApplicationError::Destroy { ref extension, .. } if extension == "cache"));
    assert_eq!(
        log.take(),
        vec!["destroy:users", "destroy:cache", "destroy:store"]
    );
}

#[test]
fn failed_init_destroys_only_initialized() {
    let log = Arc::new(EventLog::default());
    let mut cache = Cache::new(&log);
    cache.inner.fail_init = true;

    let mut app = Application::new();
    app.add_extensions(Users::new(&log))
        .add_extensions(cache)
        .add_extensions(Store::new(&log));

    let err = app.finish().unwrap_err();
    assert!(matches!(err, ApplicationError::Init { ref extension, .. } if extension == "cache"));
    assert!(!app.is_built());
    assert_eq!(log.take(), vec!["init:store", "init:cache"]);

    app.shutdown().unwrap();
    assert_eq!(log.take(), vec!["destroy:store"]);
}

#[test]
fn autowire_failure_runs_no_hooks() {
    let log = Arc::new(EventLog::default());
    let cache = Arc::new(Cache::new(&log));
    let mut app = Application::new();
    app.add_shared(Arc::clone(&cache));

    assert!(matches!(app.finish(), Err(ApplicationError::Autowire(_))));
    assert!(log.take().is_empty());
    assert!(!cache.store.is_set());
    assert!(app.shutdown().is_ok());
}

#[test]
fn depends_on_is_transitive() {
    let log = Arc::new(EventLog::default());
    let mut app = Application::new();
    app.add_extensions(Store::new(&log))
        .add_extensions(Cache::new(&log))
        .add_extensions(Users::new(&log));

    assert!(!app.depends_on::<Users, Store>());
    app.finish().unwrap();

    assert!(app.depends_on::<Users, Store>());
    assert!(app.depends_on::<Cache, Store>());
    assert!(!app.depends_on::<Store, Users>());
}

// ─────────────────────────────────────────────────────────────────────────────
// Resources published during init
// ─────────────────────────────────────────────────────────────────────────────

trait Mailer: Send + Sync {
    fn outbox(&self) -> &Mutex<Vec<String>>;
}

#[derive(Default)]
struct MemoryMailer {
    sent: Mutex<Vec<String>>,
}

impl Mailer for MemoryMailer {
    fn outbox(&self) -> &Mutex<Vec<String>> {
        &self.sent
    }
}

impl Extension for MemoryMailer {
    fn provides(provides: &mut Provides<Self>) {
        provides.capability::<dyn Mailer>(|this| this as Arc<dyn Mailer>);
    }
}

struct WelcomeMessage(String);

#[derive(Default)]
struct Signup {
    mailer: Slot<dyn Mailer>,
}

impl Extension for Signup {
    fn wants<'a>(&'a self, wants: &mut Wants<'a>) {
        wants.capability("mailer", &self.mailer);
    }

    fn init(&self, app: &mut Application) -> Result<(), ExtensionError> {
        app.insert_resource(WelcomeMessage("welcome aboard".into()));
        Ok(())
    }

    fn post_init(&self, app: &mut Application) -> Result<(), ExtensionError> {
        let mailer = self.mailer.require(self.name(), "mailer")?;
        let message = app
            .get_resource::<WelcomeMessage>()
            .ok_or_else(|| ExtensionError::failed(self.name(), "no welcome message"))?;
        mailer.outbox().lock().push(message.0.clone());
        Ok(())
    }
}

struct AccountExtensions;

impl ExtensionGroup for AccountExtensions {
    fn build(self) -> ExtensionGroupBuilder {
        ExtensionGroupBuilder::new()
            .add(Signup::default())
            .add(MemoryMailer::default())
    }
}

#[test]
fn group_extensions_share_resources() {
    let mut app = Application::new();
    app.add_extensions(AccountExtensions.build());
    app.finish().unwrap();

    let mailer = app.extension::<MemoryMailer>().unwrap();
    assert_eq!(*mailer.sent.lock(), vec!["welcome aboard".to_owned()]);
    assert!(app.contains_resource::<WelcomeMessage>());
}

#[test]
fn disabled_group_member_leaves_slot_unresolved() {
    let mut app = Application::new();
    app.add_extensions(AccountExtensions.build().disable::<MemoryMailer>());
    assert!(matches!(app.finish(), Err(ApplicationError::Autowire(_))));
}

// ─────────────────────────────────────────────────────────────────────────────
// Async run loop
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn run_until_tears_down_on_signal() {
    let log = Arc::new(EventLog::default());
    let mut app = Application::new();
    app.add_extensions(Store::new(&log))
        .add_extensions(Cache::new(&log));

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    tx.send(()).unwrap();

    app.run_until(rx).await.unwrap();

    assert_eq!(
        log.take(),
        vec![
            "init:store",
            "init:cache",
            "post_init:store",
            "post_init:cache",
            "destroy:cache",
            "destroy:store",
        ]
    );
    assert!(!app.is_built());
}

#[tokio::test]
async fn run_until_reports_start_failure() {
    let log = Arc::new(EventLog::default());
    let mut store = Store::new(&log);
    store.inner.fail_init = true;

    let mut app = Application::new();
    app.add_extensions(store);

    let result = app.run_until(core::future::pending::<()>()).await;
    assert!(matches!(result, Err(ApplicationError::Init { .. })));
    assert_eq!(log.take(), vec!["init:store"]);
}

#[tokio::test]
async fn run_until_rejects_a_failed_build() {
    let log = Arc::new(EventLog::default());
    let mut cache = Cache::new(&log);
    cache.inner.fail_init = true;

    let mut app = Application::new();
    app.add_extensions(Store::new(&log)).add_extensions(cache);
    assert!(app.finish().is_err());
    log.take();

    let result = app.run_until(core::future::pending::<()>()).await;
    assert!(matches!(result, Err(ApplicationError::NotBuilt)));
    assert!(log.take().is_empty());

    app.shutdown().unwrap();
    assert_eq!(log.take(), vec!["destroy:store"]);
}
