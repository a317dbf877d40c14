//! Single-page navigation: route table, active route and icon, mounted
//! container.

use std::{
    collections::HashMap,
    sync::{Arc, Weak},
};

use async_trait::async_trait;
use shared::{
    domain::Session,
    error::RemoteFetchError,
};
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::{
    config::NotFoundPolicy,
    containers::{Bills, NewBill},
    dom::{Icon, ViewRoot},
    session::{load_session, SessionStore},
    store::BillStore,
    views::{self, BillsPage, Navbar, ViewError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Bills,
    NewBill,
    Dashboard,
}

impl Route {
    pub const ALL: [Route; 4] = [Self::Login, Self::Bills, Self::NewBill, Self::Dashboard];

    pub fn path(self) -> &'static str {
        match self {
            Self::Login => "/",
            Self::Bills => "#employee/bills",
            Self::NewBill => "#employee/bill/new",
            Self::Dashboard => "#admin/dashboard",
        }
    }

    pub fn icon(self) -> Option<Icon> {
        match self {
            Self::Bills => Some(Icon::Window),
            Self::NewBill => Some(Icon::Mail),
            Self::Login | Self::Dashboard => None,
        }
    }

    /// Landing route for a session; `None` is the signed-out landing.
    pub fn default_for(session: Option<&Session>) -> Self {
        match session {
            None => Self::Login,
            Some(session) if session.is_employee() => Self::Bills,
            Some(_) => Self::Dashboard,
        }
    }
}

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("no route registered for path `{0}`")]
    RouteNotFound(String),
    #[error("router was dropped before navigation")]
    Detached,
    #[error(transparent)]
    View(#[from] ViewError),
}

/// Navigation entry point handed to containers.
#[async_trait]
pub trait Navigator: Send + Sync {
    async fn navigate(&self, route: Route) -> Result<(), RouterError>;
}

#[derive(Debug, Clone)]
pub enum NavigationEvent {
    RouteChanged {
        route: Route,
        icon: Option<Icon>,
    },
    RouteNotFound {
        path: String,
    },
    ViewFailed {
        route: Route,
        error: RemoteFetchError,
    },
}

/// The container bound to the current page, if the page has one.
#[derive(Clone)]
pub enum MountedView {
    Bills(Arc<Bills>),
    NewBill(Arc<NewBill>),
}

#[derive(Default)]
struct RouterState {
    active_route: Option<Route>,
    mounted: Option<MountedView>,
    // Bumped by every navigation; a render only lands if it still matches.
    generation: u64,
}

pub struct Router {
    routes: HashMap<&'static str, Route>,
    store: Arc<dyn BillStore>,
    session: Arc<dyn SessionStore>,
    root: Arc<dyn ViewRoot>,
    not_found: NotFoundPolicy,
    state: Mutex<RouterState>,
    events: broadcast::Sender<NavigationEvent>,
    this: Weak<Router>,
}

struct RouterHandle(Weak<Router>);

#[async_trait]
impl Navigator for RouterHandle {
    async fn navigate(&self, route: Route) -> Result<(), RouterError> {
        let router = self.0.upgrade().ok_or(RouterError::Detached)?;
        router.navigate_to(route).await
    }
}

impl Router {
    pub fn new(
        store: Arc<dyn BillStore>,
        session: Arc<dyn SessionStore>,
        root: Arc<dyn ViewRoot>,
    ) -> Arc<Self> {
        Self::new_with_policy(store, session, root, NotFoundPolicy::default())
    }

    pub fn new_with_policy(
        store: Arc<dyn BillStore>,
        session: Arc<dyn SessionStore>,
        root: Arc<dyn ViewRoot>,
        not_found: NotFoundPolicy,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new_cyclic(|this| Self {
            routes: Route::ALL
                .into_iter()
                .map(|route| (route.path(), route))
                .collect(),
            store,
            session,
            root,
            not_found,
            state: Mutex::new(RouterState::default()),
            events,
            this: this.clone(),
        })
    }

    pub fn navigator(&self) -> Arc<dyn Navigator> {
        Arc::new(RouterHandle(self.this.clone()))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NavigationEvent> {
        self.events.subscribe()
    }

    pub fn resolve(&self, path: &str) -> Option<Route> {
        self.routes.get(path).copied()
    }

    pub async fn active_route(&self) -> Option<Route> {
        self.state.lock().await.active_route
    }

    pub async fn active_icon(&self) -> Option<Icon> {
        self.active_route().await.and_then(Route::icon)
    }

    pub async fn mounted(&self) -> Option<MountedView> {
        self.state.lock().await.mounted.clone()
    }

    /// Renders the landing page for whoever is in the session store.
    pub async fn initialize(&self) -> Result<Route, RouterError> {
        let session = self.current_session();
        let route = Route::default_for(session.as_ref());
        info!(route = route.path(), signed_in = session.is_some(), "initializing router");
        self.navigate_to(route).await?;
        Ok(route)
    }

    /// Navigates by path. Unknown paths leave the current page and icon as
    /// they are, unless the router renders a not-found page.
    pub async fn navigate(&self, path: &str) -> Result<(), RouterError> {
        let Some(route) = self.resolve(path) else {
            warn!(path, "no route registered for path");
            if self.not_found == NotFoundPolicy::RenderPage {
                let markup = views::not_found_page(path)?;
                let mut state = self.state.lock().await;
                state.generation += 1;
                self.root.set_content(markup);
            }
            let _ = self.events.send(NavigationEvent::RouteNotFound {
                path: path.to_string(),
            });
            return Err(RouterError::RouteNotFound(path.to_string()));
        };
        self.navigate_to(route).await
    }

    /// Renders `route`. A navigation overtaken by a newer one while its data
    /// loads returns `Ok(())` without touching the page.
    pub async fn navigate_to(&self, route: Route) -> Result<(), RouterError> {
        info!(route = route.path(), "navigating");
        let generation = {
            let mut state = self.state.lock().await;
            state.generation += 1;
            state.active_route = Some(route);
            state.mounted = None;
            self.root.set_content(String::new());
            self.root.set_active_icon(route.icon());
            state.generation
        };

        let mounted = match route {
            Route::Login => {
                self.show(generation, views::login_ui()?).await;
                None
            }
            Route::Bills => self.render_bills(generation).await?.map(MountedView::Bills),
            Route::NewBill => {
                let shown = self.show(generation, views::new_bill_ui()?).await;
                shown.then(|| {
                    MountedView::NewBill(Arc::new(NewBill::new(
                        Arc::clone(&self.store),
                        Arc::clone(&self.root),
                        Arc::clone(&self.session),
                        self.navigator(),
                    )))
                })
            }
            Route::Dashboard => {
                self.render_dashboard(generation).await?;
                None
            }
        };

        {
            let mut state = self.state.lock().await;
            if state.generation != generation {
                debug!(route = route.path(), "navigation superseded");
                return Ok(());
            }
            state.mounted = mounted;
        }
        let _ = self.events.send(NavigationEvent::RouteChanged {
            route,
            icon: route.icon(),
        });
        Ok(())
    }

    /// Replaces the page if navigation `generation` is still the latest.
    async fn show(&self, generation: u64, markup: String) -> bool {
        let state = self.state.lock().await;
        if state.generation != generation {
            debug!(generation, latest = state.generation, "dropping stale page");
            return false;
        }
        self.root.set_content(markup);
        true
    }

    async fn render_bills(&self, generation: u64) -> Result<Option<Arc<Bills>>, RouterError> {
        if !self
            .show(generation, views::bills_ui(&BillsPage::loading())?)
            .await
        {
            return Ok(None);
        }

        let bills = Arc::new(Bills::new(
            Arc::clone(&self.store),
            Arc::clone(&self.root),
            self.navigator(),
        ));
        match bills.list().await {
            Ok(rows) => {
                let markup = views::bills_ui(&BillsPage::loaded(&rows))?;
                Ok(self.show(generation, markup).await.then_some(bills))
            }
            Err(err) => {
                let markup = views::bills_ui(&BillsPage::failed(&err.user_message()))?;
                if self.show(generation, markup).await {
                    self.report_view_failure(Route::Bills, err);
                }
                Ok(None)
            }
        }
    }

    async fn render_dashboard(&self, generation: u64) -> Result<(), RouterError> {
        let (markup, failure) = match self.store.list().await {
            Ok(bills) => (views::dashboard_ui(&bills)?, None),
            Err(err) => (
                views::error_page(&err.user_message(), Navbar::Admin)?,
                Some(err),
            ),
        };
        if self.show(generation, markup).await {
            if let Some(err) = failure {
                self.report_view_failure(Route::Dashboard, err);
            }
        }
        Ok(())
    }

    fn report_view_failure(&self, route: Route, error: RemoteFetchError) {
        warn!(route = route.path(), kind = ?error.kind, error = %error, "failed to load view data");
        let _ = self
            .events
            .send(NavigationEvent::ViewFailed { route, error });
    }

    fn current_session(&self) -> Option<Session> {
        load_session(self.session.as_ref()).unwrap_or_else(|err| {
            warn!(error = %err, "ignoring unreadable session record");
            None
        })
    }
}
