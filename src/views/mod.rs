//! Server-side HTML rendering.
//!
//! Templates are compiled into the binary and registered once at startup.
//! Every page shares the `layout` partial, which draws the navigation bar and
//! the inline notice for the outcome of the last action.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use handlebars::Handlebars;
use serde::Serialize;

use crate::error::RosterError;

const LAYOUT: &str = include_str!("../../templates/layout.hbs");

const PAGES: &[(&str, &str)] = &[
    ("overview", include_str!("../../templates/overview.hbs")),
    ("users", include_str!("../../templates/users.hbs")),
    ("sections", include_str!("../../templates/sections.hbs")),
    ("login", include_str!("../../templates/login.hbs")),
];

static HTML_500: &str = r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<title>Roster Admin | Error</title>
</head>
<body>
<h1>Internal Server Error</h1>
<p>(Error 500)</p>
<p>Something went wrong on our end. The problem has been logged.</p>
</body>
</html>"#;

/// Static error page for failures that prevent rendering a real one.
pub fn html_500() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, Html(HTML_500)).into_response()
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Error,
}

/// One-line message shown above the page content.
#[derive(Debug, Clone, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }
}

/// Navigation tab currently shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Overview,
    Users,
    Sections,
    Login,
}

impl Tab {
    fn template(self) -> &'static str {
        match self {
            Tab::Overview => "overview",
            Tab::Users => "users",
            Tab::Sections => "sections",
            Tab::Login => "login",
        }
    }

    fn title(self) -> &'static str {
        match self {
            Tab::Overview => "Overview",
            Tab::Users => "User Management",
            Tab::Sections => "Section Management",
            Tab::Login => "Sign in",
        }
    }
}

#[derive(Debug, Default, Serialize)]
struct Nav {
    overview: bool,
    users: bool,
    sections: bool,
}

#[derive(Serialize)]
struct Page<'a, T: Serialize> {
    title: &'static str,
    admin: Option<&'a str>,
    nav: Nav,
    notice: Option<&'a Notice>,
    body: &'a T,
}

pub struct Views {
    registry: Handlebars<'static>,
}

impl Views {
    pub fn new() -> Result<Self, RosterError> {
        let mut registry = Handlebars::new();
        registry.register_partial("layout", LAYOUT)?;
        for &(name, source) in PAGES {
            registry.register_template_string(name, source)?;
        }
        Ok(Self { registry })
    }

    /// Render `tab` inside the layout. `admin` is the signed-in username; the
    /// navigation bar is hidden without one.
    pub fn render<T: Serialize>(
        &self,
        tab: Tab,
        admin: Option<&str>,
        notice: Option<&Notice>,
        body: &T,
    ) -> Result<String, RosterError> {
        let page = Page {
            title: tab.title(),
            admin,
            nav: Nav {
                overview: tab == Tab::Overview,
                users: tab == Tab::Users,
                sections: tab == Tab::Sections,
            },
            notice,
            body,
        };
        Ok(self.registry.render(tab.template(), &page)?)
    }

    /// [`Views::render`] wrapped into an HTML response with `status`.
    pub fn respond<T: Serialize>(
        &self,
        status: StatusCode,
        tab: Tab,
        admin: Option<&str>,
        notice: Option<&Notice>,
        body: &T,
    ) -> Result<Response, RosterError> {
        let html = self.render(tab, admin, notice, body)?;
        Ok((status, Html(html)).into_response())
    }
}
