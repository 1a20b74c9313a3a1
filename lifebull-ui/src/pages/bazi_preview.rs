//! Bazi Preview Page
//!
//! Shows the pre-calculated chart while the full analysis runs.

use leptos::*;
use leptos_router::{use_location, use_navigate};
use lifebull::models::BaziResult;
use lifebull::Route;

use crate::components::{Footer, Nav};
use crate::state::{session, use_route_guard};

#[component]
pub fn BaziPreviewPage() -> impl IntoView {
    let location = use_location();
    let route = Route::parse(&location.pathname.get_untracked());
    use_route_guard(route.clone());

    let Route::BaziPreview(analysis_id) = route else {
        return view! {}.into_view();
    };

    let navigate = use_navigate();
    let bazi = session().cached_bazi(analysis_id);
    let display_name = Signal::derive(|| session().display_name());

    view! {
        <div class="min-h-screen flex flex-col">
            <Nav display_name=display_name />
            <main class="flex-1 p-4 max-w-xl mx-auto w-full">
                <h1 class="text-2xl mb-3">"基础命理信息预览"</h1>
                <p class="mb-4 text-sm">
                    "当前步骤用于展示你刚刚填写的命盘信息。后端的大师正在根据这些信息推演完整人生 K 线。"
                </p>
                <p class="mb-2 text-sm">{format!("分析任务 ID：{}", analysis_id)}</p>

                {match bazi {
                    Some(bazi) => view! { <BaziCard bazi=bazi /> }.into_view(),
                    None => view! {
                        <p class="text-sm text-gray-500">"本地未找到排盘结果，可直接查看分析。"</p>
                    }.into_view(),
                }}

                <button
                    class="mt-4 px-4 py-2.5 rounded-lg text-white bg-gradient-to-r from-rose-500 via-red-700 to-gray-800"
                    on:click=move |_| navigate(&Route::Result(analysis_id).path(), Default::default())
                >
                    "开启我的人生牛市"
                </button>
            </main>
            <Footer />
        </div>
    }
    .into_view()
}

#[component]
fn BaziCard(bazi: BaziResult) -> impl IntoView {
    let direction = if bazi.is_forward() { "顺行" } else { "逆行" };
    let da_yun = bazi.da_yun.join(" · ");

    view! {
        <div class="bg-white rounded-xl border border-gray-200 p-4 shadow-sm">
            <p class="text-sm text-gray-600 mb-3">
                {bazi.user_input.gender.chart_label()}
                {bazi.user_input.name.clone().filter(|n| !n.trim().is_empty()).map(|n| format!(" · {}", n))}
            </p>
            <div class="grid grid-cols-4 gap-2 text-center mb-4">
                {bazi.bazi.pillars().into_iter().map(|(title, pillar)| view! {
                    <div class="bg-gray-50 rounded-lg py-2">
                        <div class="text-xs text-gray-500">{title}</div>
                        <div class="text-xl font-bold text-gray-800">{pillar.label()}</div>
                        {pillar.element.clone().map(|e| view! { <div class="text-xs text-gray-400">{e}</div> })}
                    </div>
                }).collect_view()}
            </div>
            <dl class="grid grid-cols-2 gap-y-1 text-sm">
                <dt class="text-gray-500">"真太阳时"</dt><dd>{bazi.solar_time.clone()}</dd>
                <dt class="text-gray-500">"农历"</dt><dd>{bazi.lunar_date.clone()}</dd>
                <dt class="text-gray-500">"起运"</dt><dd>{format!("{}岁 ({})", bazi.start_age, direction)}</dd>
                <dt class="text-gray-500">"大运"</dt><dd>{da_yun}</dd>
            </dl>
        </div>
    }
}
