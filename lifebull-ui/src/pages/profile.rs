//! Profile Page
//!
//! Birth information form plus the invite card. Submitting runs the Bazi
//! pre-calculation, creates the analysis job and moves on to the preview.

use leptos::*;
use leptos_router::use_navigate;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

use lifebull::forms::current_year;
use lifebull::models::{Gender, UserMeResponse};
use lifebull::{ProfileForm, Route};

use crate::api;
use crate::components::{Footer, InlineLoading, Loading, Nav};
use crate::state::{session, use_auth_token, use_route_guard};

const COPY_HINT_MS: u32 = 1500;

#[component]
pub fn ProfilePage() -> impl IntoView {
    use_route_guard(Route::Profile);

    let auth = use_auth_token();
    let navigate = use_navigate();

    let form = create_rw_signal(ProfileForm::default());
    let invite = create_rw_signal(None::<UserMeResponse>);
    let (loading_user, set_loading_user) = create_signal(false);
    let (submitting, set_submitting) = create_signal(false);
    let (error, set_error) = create_signal(None::<String>);
    let display_name = create_rw_signal(session().display_name());

    // Quota, invite stats and the last birth profile
    create_effect(move |_| {
        let Some(token) = auth.get() else {
            return;
        };
        set_loading_user.set(true);
        spawn_local(async move {
            match api::get_me(&token).await {
                Ok(me) => {
                    invite.set(Some(me));
                    match api::get_latest_analysis(&token).await {
                        Ok(Some(latest)) => form.update(|f| f.prefill_from(&latest.input)),
                        Ok(None) => {}
                        Err(e) => web_sys::console::error_1(
                            &format!("getLatestAnalysis failed: {}", e).into(),
                        ),
                    }
                }
                Err(e) => web_sys::console::error_1(&e.into()),
            }
            set_loading_user.set(false);
        });
    });

    create_effect(move |_| {
        let name = form.with(|f| f.name.clone().unwrap_or_default());
        match session().remember_display_name(&name) {
            Ok(Some(stored)) => display_name.set(stored),
            Ok(None) => {}
            Err(e) => web_sys::console::warn_1(&e.to_string().into()),
        }
    });

    let on_submit = move |ev: ev::SubmitEvent| {
        ev.prevent_default();
        let Some(token) = auth.get_untracked() else {
            return;
        };
        let profile = form.get_untracked();
        if let Err(e) = profile.validate() {
            set_error.set(Some(e.to_string()));
            return;
        }
        set_error.set(None);
        set_submitting.set(true);

        let navigate = navigate.clone();
        spawn_local(async move {
            let result = async {
                let bazi = api::calculate_bazi(&token, &profile).await?;
                let input = profile.build_analysis_input(&bazi, current_year());
                let created = api::create_analysis(&token, &input).await?;
                if let Err(e) = session().cache_bazi(created.id, &bazi) {
                    web_sys::console::error_1(&format!("store baziResult failed: {}", e).into());
                }
                Ok::<_, String>(created.id)
            }
            .await;

            set_submitting.set(false);
            match result {
                Ok(id) => navigate(&Route::BaziPreview(id).path(), Default::default()),
                Err(e) => set_error.set(Some(e)),
            }
        });
    };

    view! {
        <div class="min-h-screen bg-gray-50 flex flex-col">
            <Nav display_name=display_name />

            <main class="flex-1 px-4 pt-6 pb-8 max-w-2xl mx-auto w-full flex flex-col gap-6">
                <section class="text-center">
                    <div class="mb-2 text-[#ff3164] text-3xl">"洞见人生牛市"</div>
                    <div class="mb-2 text-gray-900 text-xl">"命运有其波动"</div>
                    <p class="text-gray-600 text-sm leading-5">
                        "以易经观变，以数据成形，"<br/>
                        "让百年人生显现为一条折线"<br/><br/>
                        "看见起伏 理解节奏 把握转折"
                    </p>
                </section>

                <section class="bg-white rounded-2xl border border-gray-100 p-6 shadow-xl">
                    <div class="text-center mb-4">
                        <h1 class="text-2xl mb-1 text-gray-800">"八字排盘"</h1>
                        <p class="text-sm text-gray-500">"输入您的出生信息以进行 AI 分析"</p>
                    </div>

                    <form on:submit=on_submit class="flex flex-col gap-3.5">
                        <div class="flex gap-2">
                            <label class="flex-1 text-sm text-gray-700">
                                "姓名（可选）"
                                <input
                                    type="text"
                                    placeholder="您的姓名"
                                    class="w-full mt-1 px-3 py-2 rounded-lg border border-gray-300"
                                    prop:value=move || form.with(|f| f.name.clone().unwrap_or_default())
                                    on:input=move |ev| form.update(|f| f.name = Some(event_target_value(&ev)))
                                />
                            </label>
                            <div class="flex-1 text-sm text-gray-700">
                                "性别"
                                <div class="mt-1 flex bg-gray-100 rounded-lg p-1 gap-1">
                                    <GenderButton form=form gender=Gender::Female active_class="text-pink-600" />
                                    <GenderButton form=form gender=Gender::Male active_class="text-indigo-600" />
                                </div>
                            </div>
                        </div>

                        <label class="text-sm text-gray-700">
                            "出生日期（公历）"
                            <input
                                type="date"
                                required
                                class="w-full mt-1 px-3 py-2 rounded-lg border border-gray-300"
                                prop:value=move || form.with(|f| f.birth_date.clone())
                                on:input=move |ev| form.update(|f| f.birth_date = event_target_value(&ev))
                            />
                        </label>

                        <label class="text-sm text-gray-700">
                            "出生时间"
                            <input
                                type="time"
                                required
                                class="w-full mt-1 px-3 py-2 rounded-lg border border-gray-300"
                                prop:value=move || form.with(|f| f.birth_time.clone())
                                on:input=move |ev| form.update(|f| f.birth_time = event_target_value(&ev))
                            />
                        </label>

                        <label class="text-sm text-gray-700">
                            "出生地点"
                            <input
                                type="text"
                                required
                                placeholder="例如：中国上海"
                                class="w-full mt-1 px-3 py-2 rounded-lg border border-gray-300"
                                prop:value=move || form.with(|f| f.birth_location.clone())
                                on:input=move |ev| form.update(|f| f.birth_location = event_target_value(&ev))
                            />
                        </label>

                        {move || error.get().map(|e| view! { <div class="text-red-600 text-xs">{e}</div> })}

                        <button
                            type="submit"
                            class="mt-2 h-10 rounded-lg text-white bg-gradient-to-r from-rose-500 via-red-700 to-gray-800 shadow-lg disabled:cursor-default"
                            disabled=move || submitting.get()
                        >
                            {move || if submitting.get() {
                                view! { <InlineLoading /> " AI 正在排盘，请稍候..." }.into_view()
                            } else {
                                "开始排盘".into_view()
                            }}
                        </button>
                        <p class="mt-1.5 text-xs text-gray-400">"预计需 10–20 秒，请保持页面打开。"</p>
                    </form>

                    <div class="mt-4 bg-blue-50 rounded-lg border border-blue-100 p-3 text-xs text-blue-800">
                        <span class="font-medium">"提示："</span>
                        "AI 会根据您的出生信息自动进行八字排盘（查万年历、计算真太阳时、推导大运），然后生成 100 年人生 K 线图。"
                    </div>
                </section>

                <Show when=move || loading_user.get() || invite.with(Option::is_some)>
                    <section>
                        <h2 class="text-lg mb-2 text-gray-800">"邀请好友，获得更多次数"</h2>
                        <Show when=move || loading_user.get()>
                            <Loading message="加载中..." />
                        </Show>
                        {move || invite.get().map(|me| view! { <InviteCard me=me /> })}
                    </section>
                </Show>
            </main>

            <Footer />
        </div>
    }
}

#[component]
fn GenderButton(form: RwSignal<ProfileForm>, gender: Gender, active_class: &'static str) -> impl IntoView {
    let active = move || form.with(|f| f.gender == gender);
    view! {
        <button
            type="button"
            class=move || {
                if active() {
                    format!("flex-1 py-1.5 rounded-md text-xs font-medium bg-white shadow-sm {}", active_class)
                } else {
                    "flex-1 py-1.5 rounded-md text-xs font-medium text-gray-500".to_string()
                }
            }
            on:click=move |_| form.update(|f| f.gender = gender)
        >
            {gender.chart_label()}
        </button>
    }
}

/// Quota, referral stats and the copyable referral link
#[component]
pub fn InviteCard(me: UserMeResponse) -> impl IntoView {
    let (copy_hint, set_copy_hint) = create_signal(None::<&'static str>);
    let url = me.my_referral_url.clone();

    let on_copy = move |_| {
        if url.is_empty() {
            return;
        }
        let url = url.clone();
        spawn_local(async move {
            match copy_to_clipboard(&url).await {
                Ok(()) => {
                    set_copy_hint.set(Some("已复制"));
                    gloo_timers::future::TimeoutFuture::new(COPY_HINT_MS).await;
                    let _ = set_copy_hint.try_set(None);
                }
                Err(e) => web_sys::console::error_1(&e),
            }
        });
    };

    view! {
        <div class="bg-gradient-to-br from-purple-50 to-pink-50 rounded-xl border border-purple-200 p-4 shadow-sm">
            <p class="mb-1 text-sm text-gray-800">"每成功推荐5人，获得+1次额外机会"</p>
            <p class="mb-1 text-sm text-gray-600">
                {format!("今日剩余次数：{}/{}", me.today_remaining, me.today_total_quota())}
            </p>
            <p class="mb-1 text-sm text-gray-600">
                {format!("基础 {} 次 / 推广 {} 次", me.today_base_quota, me.today_extra_quota)}
            </p>
            <p class="mb-1 text-sm text-gray-600">
                {format!("累计推荐：{} 人，今日获得：{} 人", me.total_invited, me.invited_today)}
            </p>
            <div class="mt-3">
                <div class="mb-1 text-xs text-gray-600">"您的专属推广链接"</div>
                <div class="flex items-center gap-2">
                    <div class="flex-1 px-3 py-2 rounded-full border border-gray-200 bg-white text-xs text-gray-500 truncate">
                        {me.my_referral_url.clone()}
                    </div>
                    <button
                        type="button"
                        class="px-3 py-1.5 rounded-lg bg-[#ff4076] text-xs text-white whitespace-nowrap"
                        on:click=on_copy
                    >
                        {move || copy_hint.get().unwrap_or("复制")}
                    </button>
                </div>
            </div>
        </div>
    }
}

/// `navigator.clipboard.writeText(text)`
async fn copy_to_clipboard(text: &str) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let navigator: JsValue = window.navigator().into();
    let clipboard = js_sys::Reflect::get(&navigator, &JsValue::from_str("clipboard"))?;
    let write_text: js_sys::Function =
        js_sys::Reflect::get(&clipboard, &JsValue::from_str("writeText"))?.dyn_into()?;
    let promise: js_sys::Promise = write_text.call1(&clipboard, &JsValue::from_str(text))?.dyn_into()?;
    JsFuture::from(promise).await?;
    Ok(())
}
