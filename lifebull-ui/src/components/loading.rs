//! Loading Component
//!
//! Spinners for pending requests and the analysis in progress.

use leptos::*;

/// Full-width loading spinner with an optional caption
#[component]
pub fn Loading(#[prop(optional, into)] message: Option<String>) -> impl IntoView {
    view! {
        <div class="flex flex-col items-center justify-center py-12 gap-3">
            <div class="w-8 h-8 border-4 border-indigo-200 border-t-indigo-600 rounded-full animate-spin" />
            {message.map(|m| view! { <p class="text-sm text-gray-500">{m}</p> })}
        </div>
    }
}

/// Inline loading spinner for buttons
#[component]
pub fn InlineLoading() -> impl IntoView {
    view! {
        <span class="inline-block w-4 h-4 border-2 border-white/40 border-t-white rounded-full animate-spin align-middle" />
    }
}
