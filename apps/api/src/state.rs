use sqlx::PgPool;

use crate::clients::assets::AssetClient;
use crate::clients::chat::ChatClient;
use crate::clients::identity::IdentityClient;
use crate::clients::image_gen::ImageGenClient;
use crate::config::Config;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub chat: ChatClient,
    pub image_gen: ImageGenClient,
    pub assets: AssetClient,
    pub identity: IdentityClient,
    pub config: Config,
}
