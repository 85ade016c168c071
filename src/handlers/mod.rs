use axum::extract::FromRef;

use crate::{
    config::Config,
    db::{DbPool, ReferenceStore, ShipmentStore, UserStore},
    services::{AuthService, ShipmentService},
};

pub mod auth;
pub mod reference;
pub mod report;
pub mod shipment;
pub mod user;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub shipments: ShipmentService,
    pub references: ReferenceStore,
    pub users: UserStore,
}

impl AppState {
    pub fn new(pool: DbPool, config: &Config) -> Self {
        let users = UserStore::new(pool.clone());
        let references = ReferenceStore::new(pool.clone());
        let shipments = ShipmentService::new(
            ShipmentStore::new(pool),
            references.clone(),
            config.prepayment_split,
            config.share_base_url.clone(),
        );
        let auth = AuthService::new(&config.jwt_secret, config.jwt_expiration_hours, users.clone());

        Self {
            auth,
            shipments,
            references,
            users,
        }
    }
}

impl FromRef<AppState> for AuthService {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}
