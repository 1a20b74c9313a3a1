//! Auth Page
//!
//! Phone + SMS code login, with the inviter code prefilled from `?ref=`.

use leptos::*;
use leptos_router::{use_location, use_navigate, NavigateOptions};
use lifebull::routes::referral_code_from_query;
use lifebull::{LoginForm, Route};

use crate::api;
use crate::components::{Footer, InlineLoading};
use crate::state::{use_auth_token, use_route_guard};

#[component]
pub fn AuthPage() -> impl IntoView {
    use_route_guard(Route::Auth);

    let auth = use_auth_token();
    let navigate = use_navigate();
    let location = use_location();

    let form = create_rw_signal(LoginForm::default());
    let (sending, set_sending) = create_signal(false);
    let (submitting, set_submitting) = create_signal(false);
    let (error, set_error) = create_signal(None::<String>);

    create_effect(move |_| {
        if let Some(code) = referral_code_from_query(&location.search.get()) {
            form.update(|f| f.inviter_code = code);
        }
    });

    let on_send_code = move |_| {
        let phone = form.with_untracked(|f| f.phone.clone());
        set_error.set(None);
        set_sending.set(true);
        spawn_local(async move {
            if let Err(e) = api::send_code(&phone).await {
                set_error.set(Some(e));
            }
            set_sending.set(false);
        });
    };

    let on_submit = move |ev: ev::SubmitEvent| {
        ev.prevent_default();
        let current = form.get_untracked();
        if !current.can_submit() {
            return;
        }
        set_error.set(None);
        set_submitting.set(true);

        let navigate = navigate.clone();
        spawn_local(async move {
            match api::verify_code(&current.phone, &current.code, current.inviter()).await {
                Ok(token) => {
                    auth.set(Some(token.access_token));
                    navigate(
                        &Route::Profile.path(),
                        NavigateOptions {
                            replace: true,
                            ..Default::default()
                        },
                    );
                }
                Err(e) => set_error.set(Some(e)),
            }
            set_submitting.set(false);
        });
    };

    view! {
        <div class="min-h-screen flex flex-col">
            <div class="p-4">
                <header class="mb-6">
                    <h1 class="text-2xl mb-1">"人生牛市"</h1>
                    <p class="text-xs text-gray-500">"Life's bull market"</p>
                </header>
                <section class="mb-4">
                    <h2 class="text-xl mb-1">"八字排盘"</h2>
                    <p class="text-sm text-gray-500">"填写邀请码并使用手机号登录，开启你的人生牛市。"</p>
                </section>
            </div>

            <div class="p-4 flex-1 max-w-md mx-auto w-full">
                <form on:submit=on_submit class="flex flex-col gap-3">
                    <label class="text-sm text-gray-700">
                        "邀请码（可选）"
                        <input
                            type="text"
                            placeholder="请输入邀请码"
                            class="w-full mt-1 px-3 py-2 rounded-lg border border-gray-300"
                            prop:value=move || form.with(|f| f.inviter_code.clone())
                            on:input=move |ev| form.update(|f| f.inviter_code = event_target_value(&ev))
                        />
                    </label>

                    <label class="text-sm text-gray-700">
                        "手机号"
                        <input
                            type="tel"
                            required
                            class="w-full mt-1 px-3 py-2 rounded-lg border border-gray-300"
                            prop:value=move || form.with(|f| f.phone.clone())
                            on:input=move |ev| form.update(|f| f.phone = event_target_value(&ev))
                        />
                    </label>

                    <div class="flex gap-2 items-end">
                        <label class="flex-1 text-sm text-gray-700">
                            "验证码"
                            <input
                                type="text"
                                required
                                class="w-full mt-1 px-3 py-2 rounded-lg border border-gray-300"
                                prop:value=move || form.with(|f| f.code.clone())
                                on:input=move |ev| form.update(|f| f.code = event_target_value(&ev))
                            />
                        </label>
                        <button
                            type="button"
                            class="px-3 py-2 rounded-lg bg-gray-100 text-sm disabled:opacity-50"
                            disabled=move || sending.get() || !form.with(LoginForm::can_send_code)
                            on:click=on_send_code
                        >
                            {move || if sending.get() { "发送中..." } else { "发送验证码" }}
                        </button>
                    </div>

                    {move || error.get().map(|e| view! { <div class="text-red-600 text-xs">{e}</div> })}

                    <button
                        type="submit"
                        class="mt-2 py-2.5 rounded-lg text-white bg-gradient-to-r from-rose-500 via-red-700 to-gray-800 disabled:opacity-60"
                        disabled=move || submitting.get()
                    >
                        {move || if submitting.get() {
                            view! { <InlineLoading /> " 登录中..." }.into_view()
                        } else {
                            "打开我的人生牛市".into_view()
                        }}
                    </button>
                </form>
            </div>

            <Footer />
        </div>
    }
}
