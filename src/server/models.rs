use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct OgQuery {
    pub(crate) title: Option<String>,
    #[serde(alias = "site_name")]
    pub(crate) sitename: Option<String>,
    pub(crate) tag: Option<String>,
    pub(crate) font: Option<String>,
    pub(crate) top: Option<String>,
    pub(crate) bottom: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}
