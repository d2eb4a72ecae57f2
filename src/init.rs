use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

use crate::handler::Handler;
use crate::layer::TintLayer;

/// Configuration of the `tracing` bridge.
///
/// **Fields**
/// - `span_fields`: add the fields recorded on enclosing spans to each
///   event, grouped under the span name.
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub span_fields: bool,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self { span_fields: true }
    }
}

/// Error returned when a global subscriber is already installed.
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error(transparent)]
    AlreadySet(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Install a [`Registry`] with a [`TintLayer`] around `handler` as the
/// global default subscriber.
///
/// **Parameters**
/// - `handler`: renders every enabled event, e.g. a
///   [`crate::TintHandler`] writing to stderr.
/// - `config`: [`LayerConfig`] of the bridge.
///
/// **Returns**
/// - `Err(InitError::AlreadySet)` if a global subscriber already exists.
pub fn init_tracing_with_config<H>(handler: H, config: LayerConfig) -> Result<(), InitError>
where
    H: Handler + 'static,
{
    let subscriber = Registry::default().with(TintLayer::with_config(handler, config));
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Initialize tracing with the default [`LayerConfig`].
pub fn init_tracing<H>(handler: H) -> Result<(), InitError>
where
    H: Handler + 'static,
{
    init_tracing_with_config(handler, LayerConfig::default())
}
