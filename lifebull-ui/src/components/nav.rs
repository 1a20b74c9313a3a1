//! Navigation Component
//!
//! Header bar with the brand and a menu holding the display name and logout.

use leptos::*;
use leptos_router::{use_navigate, NavigateOptions, A};
use lifebull::Route;

use crate::state::use_auth_token;

/// Header shown on every logged-in page
#[component]
pub fn Nav(#[prop(into)] display_name: Signal<String>) -> impl IntoView {
    let auth = use_auth_token();
    let navigate = use_navigate();
    let (show_menu, set_show_menu) = create_signal(false);

    let on_logout = move |_| {
        set_show_menu.set(false);
        auth.set(None);
        navigate(
            &Route::Auth.path(),
            NavigateOptions {
                replace: true,
                ..Default::default()
            },
        );
    };

    view! {
        <header class="bg-white py-4 border-b border-gray-200">
            <div class="max-w-2xl mx-auto px-4 relative flex items-center">
                <A href=Route::Profile.path() class="flex items-center gap-3">
                    <span class="w-10 h-10 rounded-lg bg-gradient-to-br from-rose-500 to-red-700 text-white flex items-center justify-center text-xl">
                        "牛"
                    </span>
                    <div>
                        <div class="text-lg leading-6 text-gray-900">"人生牛市"</div>
                        <div class="text-xs text-gray-500">"Life's bull market"</div>
                    </div>
                </A>

                <button
                    type="button"
                    class="ml-auto w-8 h-8 flex items-center justify-center text-gray-600 hover:text-gray-900"
                    on:click=move |_| set_show_menu.update(|v| *v = !*v)
                    aria-label="菜单"
                >
                    "☰"
                </button>

                <Show when=move || show_menu.get()>
                    <div class="absolute top-14 right-4 w-40 bg-white rounded-xl border border-gray-200 shadow-lg overflow-hidden z-20">
                        <div class="px-3 py-2.5 text-sm text-gray-700 border-b border-gray-100">
                            {move || display_name.get()}
                        </div>
                        <button
                            type="button"
                            class="w-full px-3 py-2.5 text-sm text-red-700 text-left hover:bg-red-50"
                            on:click=on_logout.clone()
                        >
                            "退出登录"
                        </button>
                    </div>
                </Show>
            </div>
        </header>
    }
}
