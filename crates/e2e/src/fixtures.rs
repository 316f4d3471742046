//! Per-test fixture provisioning
//!
//! A test asks its [`TestScope`] for typed fixtures by key. Each fixture is
//! built lazily on first request, at most once per scope, and its
//! constructor may request other fixtures through the same scope. Teardowns
//! run in reverse construction order when the scope is torn down, whatever
//! the outcome of the test body.
//!
//! ```text
//!   test body ── get(&CAREER_PAGE) ──► career_page ──► base_page ──► page
//!                                                                     │
//!                                      Ambient (config, provider) ◄───┘
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::a11y::{Audit, AuditEngine};
use crate::browser::{ContextProvider, SharedContext};
use crate::config::HarnessConfig;
use crate::error::{E2eError, E2eResult};
use crate::links::LinkChecker;
use crate::locator::BrowserPage;
use crate::model::Viewport;
use crate::pages::{BasePage, CareerPage, ContactPage, DemosPage};
use crate::trace::{TraceLog, TracedContext};

/// Typed fixture name
pub struct FixtureKey<T> {
    name: &'static str,
    _type: PhantomData<fn() -> T>,
}

impl<T> FixtureKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _type: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> fmt::Debug for FixtureKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FixtureKey({})", self.name)
    }
}

pub const PAGE: FixtureKey<BrowserPage> = FixtureKey::new("page");
pub const BASE_PAGE: FixtureKey<BasePage> = FixtureKey::new("base_page");
pub const CAREER_PAGE: FixtureKey<CareerPage> = FixtureKey::new("career_page");
pub const DEMOS_PAGE: FixtureKey<DemosPage> = FixtureKey::new("demos_page");
pub const CONTACT_PAGE: FixtureKey<ContactPage> = FixtureKey::new("contact_page");
pub const AUDIT: FixtureKey<Audit> = FixtureKey::new("audit");
pub const LINKS: FixtureKey<LinkChecker> = FixtureKey::new("links");

type Instance = Arc<dyn Any + Send + Sync>;
type Teardown = Box<dyn FnOnce() -> BoxFuture<'static, E2eResult<()>> + Send + Sync>;

/// Async fixture constructor
pub type Constructor = for<'a> fn(&'a mut TestScope) -> BoxFuture<'a, E2eResult<Provisioned>>;

/// A constructed fixture value plus its optional teardown
pub struct Provisioned {
    value: Instance,
    teardown: Option<Teardown>,
}

impl Provisioned {
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            teardown: None,
        }
    }

    pub fn with_teardown<F, Fut>(mut self, teardown: F) -> Self
    where
        F: FnOnce() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = E2eResult<()>> + Send + 'static,
    {
        self.teardown = Some(Box::new(move || Box::pin(teardown())));
        self
    }
}

/// Name to constructor table shared by every scope of a run
#[derive(Clone, Default)]
pub struct FixtureRegistry {
    constructors: HashMap<&'static str, Constructor>,
}

impl FixtureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Page surfaces, the audit factory and the link checker
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(&PAGE, provide_page);
        registry.register(&BASE_PAGE, provide_base_page);
        registry.register(&CAREER_PAGE, provide_career_page);
        registry.register(&DEMOS_PAGE, provide_demos_page);
        registry.register(&CONTACT_PAGE, provide_contact_page);
        registry.register(&AUDIT, provide_audit);
        registry.register(&LINKS, provide_links);
        registry
    }

    /// Register or replace the constructor for `key`
    pub fn register<T>(&mut self, key: &FixtureKey<T>, constructor: Constructor) {
        self.constructors.insert(key.name(), constructor);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.constructors.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

/// Context supplied by the runner to every scope
#[derive(Clone)]
pub struct Ambient {
    pub config: Arc<HarnessConfig>,
    pub provider: Arc<dyn ContextProvider>,
    pub audit_engine: Arc<AuditEngine>,
    pub viewport: Viewport,
    pub trace: TraceLog,
}

/// Fixture instances and teardowns owned by one test attempt
pub struct TestScope {
    id: Uuid,
    registry: Arc<FixtureRegistry>,
    ambient: Ambient,
    instances: HashMap<&'static str, Instance>,
    teardowns: Vec<(&'static str, Teardown)>,
    constructing: Vec<&'static str>,
}

impl TestScope {
    pub fn new(registry: Arc<FixtureRegistry>, ambient: Ambient) -> Self {
        Self {
            id: Uuid::new_v4(),
            registry,
            ambient,
            instances: HashMap::new(),
            teardowns: Vec::new(),
            constructing: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn ambient(&self) -> &Ambient {
        &self.ambient
    }

    pub fn config(&self) -> &Arc<HarnessConfig> {
        &self.ambient.config
    }

    pub fn trace(&self) -> &TraceLog {
        &self.ambient.trace
    }

    /// Fixture for `key`, constructing it and its dependencies on first use
    pub async fn get<T: Send + Sync + 'static>(&mut self, key: &FixtureKey<T>) -> E2eResult<Arc<T>> {
        let name = key.name();
        if let Some(instance) = self.instances.get(name) {
            return downcast(name, instance.clone());
        }

        if self.constructing.contains(&name) {
            let mut chain: Vec<&str> = self.constructing.clone();
            chain.push(name);
            return Err(E2eError::FixtureCycle(chain.join(" -> ")));
        }

        let constructor = *self
            .registry
            .constructors
            .get(name)
            .ok_or_else(|| E2eError::UnknownFixture(name.to_string()))?;

        debug!(scope = %self.id, fixture = name, "constructing fixture");
        self.constructing.push(name);
        let result = constructor(self).await;
        self.constructing.pop();

        let provisioned = result.map_err(|e| match e {
            // Keep the innermost failing fixture as the reported name
            E2eError::FixtureConstruction { .. } | E2eError::FixtureCycle(_) => e,
            other => E2eError::FixtureConstruction {
                name: name.to_string(),
                source: Box::new(other),
            },
        })?;

        if let Some(teardown) = provisioned.teardown {
            self.teardowns.push((name, teardown));
        }
        self.instances.insert(name, provisioned.value.clone());
        downcast(name, provisioned.value)
    }

    /// Already constructed fixture, without constructing it
    pub fn peek<T: Send + Sync + 'static>(&self, key: &FixtureKey<T>) -> Option<Arc<T>> {
        self.instances
            .get(key.name())
            .and_then(|instance| instance.clone().downcast::<T>().ok())
    }

    /// Browsing context of the `page` fixture, if one was opened
    pub fn opened_context(&self) -> Option<SharedContext> {
        self.peek(&PAGE).map(|page| page.context().clone())
    }

    /// Names of the fixtures constructed so far
    pub fn constructed(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.instances.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Run every registered teardown in reverse construction order. A second
    /// call finds nothing left to run. Errors are logged and returned.
    pub async fn teardown(&mut self) -> Vec<E2eError> {
        let mut errors = Vec::new();
        while let Some((name, teardown)) = self.teardowns.pop() {
            debug!(scope = %self.id, fixture = name, "tearing down fixture");
            if let Err(e) = teardown().await {
                warn!(scope = %self.id, fixture = name, error = %e, "fixture teardown failed");
                errors.push(e);
            }
        }
        self.instances.clear();
        errors
    }
}

fn downcast<T: Send + Sync + 'static>(name: &str, instance: Instance) -> E2eResult<Arc<T>> {
    instance.downcast::<T>().map_err(|_| E2eError::FixtureType {
        name: name.to_string(),
        expected: std::any::type_name::<T>(),
    })
}

fn provide_page(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<Provisioned>> {
    Box::pin(async move {
        let ambient = scope.ambient().clone();
        let raw = ambient.provider.open(ambient.viewport).await?;
        let ctx = TracedContext::wrap(raw, ambient.trace.clone());
        let page = BrowserPage::new(ctx.clone(), ambient.config);
        Ok(Provisioned::new(page).with_teardown(move || async move { ctx.close().await }))
    })
}

fn provide_base_page(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<Provisioned>> {
    Box::pin(async move {
        let page = scope.get(&PAGE).await?;
        Ok(Provisioned::new(BasePage::new(BrowserPage::clone(&page))))
    })
}

fn provide_career_page(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<Provisioned>> {
    Box::pin(async move {
        let base = scope.get(&BASE_PAGE).await?;
        Ok(Provisioned::new(CareerPage::from_base(BasePage::clone(&base))))
    })
}

fn provide_demos_page(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<Provisioned>> {
    Box::pin(async move {
        let base = scope.get(&BASE_PAGE).await?;
        Ok(Provisioned::new(DemosPage::from_base(BasePage::clone(&base))))
    })
}

fn provide_contact_page(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<Provisioned>> {
    Box::pin(async move {
        let base = scope.get(&BASE_PAGE).await?;
        Ok(Provisioned::new(ContactPage::from_base(BasePage::clone(&base))))
    })
}

fn provide_audit(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<Provisioned>> {
    Box::pin(async move {
        let page = scope.get(&PAGE).await?;
        let ambient = scope.ambient();
        let audit = Audit::new(
            BrowserPage::clone(&page),
            ambient.audit_engine.clone(),
            ambient.trace.clone(),
        );
        Ok(Provisioned::new(audit))
    })
}

fn provide_links(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<Provisioned>> {
    Box::pin(async move { Ok(Provisioned::new(LinkChecker::new(scope.config())?)) })
}
