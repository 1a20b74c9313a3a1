//! Auth Token State
//!
//! The stored bearer token as a signal. Every change is written back to local
//! storage, and pages redirect when it appears or disappears.

use leptos::*;
use leptos_router::{use_navigate, NavigateOptions};
use lifebull::{Route, Session};

use super::storage::LocalStorage;

#[derive(Clone, Copy)]
pub struct AuthToken {
    token: RwSignal<Option<String>>,
}

impl AuthToken {
    pub fn get(&self) -> Option<String> {
        self.token.get()
    }

    pub fn get_untracked(&self) -> Option<String> {
        self.token.get_untracked()
    }

    pub fn set(&self, token: Option<String>) {
        self.token.set(token);
    }

    pub fn is_logged_in(&self) -> bool {
        self.token.with(Option::is_some)
    }
}

pub fn session() -> Session<LocalStorage> {
    Session::new(LocalStorage)
}

/// Provide the token signal to the component tree
pub fn provide_auth_token() {
    let token = create_rw_signal(session().token());

    create_effect(move |_| {
        let value = token.get();
        if let Err(e) = session().set_token(value.as_deref()) {
            web_sys::console::warn_1(&format!("Failed to persist token: {}", e).into());
        }
    });

    provide_context(AuthToken { token });
}

pub fn use_auth_token() -> AuthToken {
    use_context::<AuthToken>().expect("AuthToken not provided")
}

/// Keep the user on a page they may see, given the current token
pub fn use_route_guard(current: Route) {
    let auth = use_auth_token();
    let navigate = use_navigate();

    create_effect(move |_| {
        let target = current.clone().guard(auth.is_logged_in());
        if target != current {
            navigate(
                &target.path(),
                NavigateOptions {
                    replace: true,
                    ..Default::default()
                },
            );
        }
    });
}
