//! App Root Component
//!
//! Routing and the auth token provider.

use leptos::*;
use leptos_router::*;

use crate::pages::{AuthPage, BaziPreviewPage, ProfilePage, ResultPage};
use crate::state::auth::provide_auth_token;

/// Root application component
#[component]
pub fn App() -> impl IntoView {
    provide_auth_token();

    view! {
        <Router>
            <div class="min-h-screen bg-gray-50 text-gray-900 flex flex-col">
                <Routes>
                    <Route path="/" view=ToAuth />
                    <Route path="/auth" view=AuthPage />
                    <Route path="/profile" view=ProfilePage />
                    <Route path="/bazi/:analysis_id" view=BaziPreviewPage />
                    <Route path="/result/:analysis_id" view=ResultPage />
                    <Route path="/*any" view=ToAuth />
                </Routes>
            </div>
        </Router>
    }
}

/// `/` and unknown paths land on the auth page
#[component]
fn ToAuth() -> impl IntoView {
    view! {
        <Redirect
            path=lifebull::Route::Auth.path()
            options=NavigateOptions { replace: true, ..Default::default() }
        />
    }
}
