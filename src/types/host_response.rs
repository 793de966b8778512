/// What the host sends back to the browser once the engine gave up control
#[derive(Debug, Clone, PartialEq)]
pub enum HostResponse {
    /// HTTP redirect to the url
    Redirect(String),
    /// Full html page
    Page {
        /// Http status code of the page
        status: u16,
        /// The html body
        body: String,
    },
}

impl HostResponse {
    /// A `200` html page
    pub fn page(body: impl Into<String>) -> Self {
        Self::Page {
            status: 200,
            body: body.into(),
        }
    }

    /// Target of the redirect, if this is one
    pub fn redirect_location(&self) -> Option<&str> {
        match self {
            Self::Redirect(url) => Some(url),
            Self::Page { .. } => None,
        }
    }

    /// Body of the page, if this is one
    pub fn page_body(&self) -> Option<&str> {
        match self {
            Self::Page { body, .. } => Some(body),
            Self::Redirect(_) => None,
        }
    }
}
