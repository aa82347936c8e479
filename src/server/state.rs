use crate::compose::OgImageGenerator;
use crate::settings::Settings;

pub struct ServerState<P> {
    pub settings: Settings,
    pub generator: OgImageGenerator<P>,
}
