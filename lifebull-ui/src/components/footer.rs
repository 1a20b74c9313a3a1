use leptos::*;

#[component]
pub fn Footer() -> impl IntoView {
    view! {
        <footer class="py-6 text-center text-xs text-gray-400">
            "© 2025 人生牛市 | 仅供娱乐，请勿迷信"
        </footer>
    }
}
