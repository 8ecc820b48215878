//! Named pages and the sidebar navigation.
//!
//! Each page path answers `GET` with a descriptor of what the page shows. Pages that
//! require sign-in redirect anonymous visitors to `/login` once auth has settled.

use axum::{
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::auth::{AuthContext, Identity};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Page {
    Home,
    Explore,
    Vocabulary,
    Pronunciation,
    Roleplay,
    Grammar,
    VocabLists,
    Login,
}

impl Page {
    pub const ALL: [Page; 8] = [
        Page::Home,
        Page::Explore,
        Page::Vocabulary,
        Page::Pronunciation,
        Page::Roleplay,
        Page::Grammar,
        Page::VocabLists,
        Page::Login,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Page::Home => "/",
            Page::Explore => "/explore",
            Page::Vocabulary => "/vocabulary",
            Page::Pronunciation => "/pronunciation",
            Page::Roleplay => "/roleplay",
            Page::Grammar => "/grammar",
            Page::VocabLists => "/vocab-lists",
            Page::Login => "/login",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Page::Home => "Home",
            Page::Explore => "Explore Features",
            Page::Vocabulary => "Vocabulary",
            Page::Pronunciation => "Pronunciation",
            Page::Roleplay => "Roleplay",
            Page::Grammar => "Grammar",
            Page::VocabLists => "Vocab Lists",
            Page::Login => "Login",
        }
    }

    pub fn requires_auth(self) -> bool {
        matches!(self, Page::Explore)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavItem {
    pub page: Page,
    pub href: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct FeatureCard {
    pub title: &'static str,
    pub description: &'static str,
    pub href: &'static str,
}

pub const FEATURE_CARDS: &[FeatureCard] = &[
    FeatureCard {
        title: "Vocabulary Builder",
        description: "Learn new words, their meanings, pronunciations, and example sentences. Translate to your native language.",
        href: "/vocabulary",
    },
    FeatureCard {
        title: "Pronunciation Practice",
        description: "Get feedback on your English pronunciation to sound more natural.",
        href: "/pronunciation",
    },
    FeatureCard {
        title: "Interactive Roleplay",
        description: "Practice spoken English in real-life scenarios like ordering at a restaurant or checking in at an airport.",
        href: "/roleplay",
    },
    FeatureCard {
        title: "Grammar Assistance",
        description: "Understand English grammar rules and get your sentences corrected with detailed explanations.",
        href: "/grammar",
    },
    FeatureCard {
        title: "Curated Vocabulary Lists",
        description: "Access vocabulary lists tailored for different proficiency levels: beginner, intermediate, and advanced.",
        href: "/vocab-lists",
    },
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageView {
    pub page: Page,
    pub path: &'static str,
    pub label: &'static str,
    pub requires_auth: bool,
    pub user: Option<Identity>,
    pub loading: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<&'static [FeatureCard]>,
}

pub fn navigation() -> Vec<NavItem> {
    Page::ALL
        .into_iter()
        .filter(|page| *page != Page::Login)
        .map(|page| NavItem {
            page,
            href: page.path(),
            label: page.label(),
        })
        .collect()
}

/// GET /api/v1/navigation
pub async fn handle_navigation() -> Json<Vec<NavItem>> {
    Json(navigation())
}

/// A protected page shows nothing but the loading state until auth settles.
fn render_page(page: Page, auth: AuthContext) -> Response {
    if page.requires_auth() && auth.should_redirect_to_login() {
        return Redirect::to(Page::Login.path()).into_response();
    }

    let features = match page {
        Page::Explore if auth.user.is_some() => Some(FEATURE_CARDS),
        _ => None,
    };

    Json(PageView {
        page,
        path: page.path(),
        label: page.label(),
        requires_auth: page.requires_auth(),
        user: auth.user,
        loading: auth.loading,
        features,
    })
    .into_response()
}

/// One `GET` route per page.
pub fn page_routes() -> Router<AppState> {
    Page::ALL.into_iter().fold(Router::new(), |router, page| {
        router.route(
            page.path(),
            get(move |auth: AuthContext| async move { render_page(page, auth) }),
        )
    })
}
