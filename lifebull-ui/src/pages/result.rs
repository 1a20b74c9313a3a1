//! Result Page
//!
//! Polls the analysis while it is pending, then shows the scored report and
//! the life K-line chart.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use gloo_timers::callback::Timeout;
use leptos::*;
use leptos_router::use_location;

use lifebull::models::{AnalysisDetail, AnalysisStatus, LifeDestinyResult, UserMeResponse};
use lifebull::{PollDecision, Route, POLL_INTERVAL};

use crate::api;
use crate::components::{Footer, LifeKLineChart, Loading, Nav};
use crate::pages::profile::InviteCard;
use crate::state::{session, use_auth_token, use_route_guard};

/// Width of a 0-10 score bar, in percent
pub fn score_percent(score: f64) -> f64 {
    if !score.is_finite() {
        return 0.0;
    }
    score.clamp(0.0, 10.0) * 10.0
}

/// Pending fetch timer; dropping the `Timeout` cancels it
#[derive(Clone, Default)]
struct PollHandle {
    alive: Rc<Cell<bool>>,
    timer: Rc<RefCell<Option<Timeout>>>,
}

impl PollHandle {
    fn start() -> Self {
        let handle = Self::default();
        handle.alive.set(true);
        handle
    }

    fn is_alive(&self) -> bool {
        self.alive.get()
    }

    fn schedule(&self, timeout: Timeout) {
        *self.timer.borrow_mut() = Some(timeout);
    }

    fn cancel(&self) {
        self.alive.set(false);
        self.timer.borrow_mut().take();
    }
}

fn poll_analysis(
    token: String,
    id: i64,
    analysis: RwSignal<Option<AnalysisDetail>>,
    error: RwSignal<Option<String>>,
    handle: PollHandle,
) {
    spawn_local(async move {
        let result = api::get_analysis(&token, id).await;
        if !handle.is_alive() {
            return;
        }
        match result {
            Ok(detail) => {
                let decision = PollDecision::after(&detail.status);
                analysis.set(Some(detail));
                if decision == PollDecision::Continue {
                    let next = handle.clone();
                    let delay = POLL_INTERVAL.as_millis() as u32;
                    handle.schedule(Timeout::new(delay, move || {
                        poll_analysis(token, id, analysis, error, next)
                    }));
                }
            }
            Err(e) => error.set(Some(e)),
        }
    });
}

#[component]
pub fn ResultPage() -> impl IntoView {
    let location = use_location();
    let route = Route::parse(&location.pathname.get_untracked());
    use_route_guard(route.clone());

    let Route::Result(analysis_id) = route else {
        return view! {}.into_view();
    };

    let auth = use_auth_token();
    let analysis = create_rw_signal(None::<AnalysisDetail>);
    let error = create_rw_signal(None::<String>);
    let invite = create_rw_signal(None::<UserMeResponse>);
    let display_name = Signal::derive(|| session().display_name());

    let handle = PollHandle::start();
    if let Some(token) = auth.get_untracked() {
        poll_analysis(token.clone(), analysis_id, analysis, error, handle.clone());

        spawn_local(async move {
            match api::get_me(&token).await {
                Ok(me) => {
                    let _ = invite.try_set(Some(me));
                }
                Err(e) => web_sys::console::error_1(&e.into()),
            }
        });
    }
    on_cleanup(move || handle.cancel());

    view! {
        <div class="min-h-screen flex flex-col">
            <Nav display_name=display_name />
            <main class="flex-1 p-4 max-w-3xl mx-auto w-full">
                <h1 class="text-2xl mb-3">"人生牛市 · 分析结果"</h1>

                {move || error.get().map(|e| view! { <p class="text-red-600 mb-4">{e}</p> })}

                {move || {
                    match (analysis.get(), error.with(Option::is_some)) {
                        (None, false) => view! { <Loading message="加载中..." /> }.into_view(),
                        (None, true) => view! {}.into_view(),
                        (Some(detail), _) => view! { <AnalysisView detail=detail /> }.into_view(),
                    }
                }}

                <hr class="my-6" />

                <section>
                    <h2 class="text-lg mb-2">"邀请好友，获得更多测算次数"</h2>
                    {move || invite.get().map(|me| view! { <InviteCard me=me /> })}
                </section>
            </main>
            <Footer />
        </div>
    }
    .into_view()
}

#[component]
fn AnalysisView(detail: AnalysisDetail) -> impl IntoView {
    match &detail.status {
        AnalysisStatus::Pending => view! {
            <div class="mb-6">
                <Loading message="大师推演中（约 3–5 分钟），请稍候..." />
            </div>
        }
        .into_view(),
        AnalysisStatus::Error => view! {
            <div class="mb-6">
                <p class="text-red-600">
                    {format!("分析失败：{}", detail.error_message.clone().unwrap_or_default())}
                </p>
            </div>
        }
        .into_view(),
        AnalysisStatus::Done => match detail.destiny() {
            Some(destiny) => view! { <Report id=detail.id destiny=destiny /> }.into_view(),
            None => view! {
                <p class="mb-6">{format!("分析已完成（ID：{}），暂无报告内容。", detail.id)}</p>
            }
            .into_view(),
        },
        AnalysisStatus::Other(status) => view! {
            <p class="mb-6 text-gray-500">{format!("未知状态：{}", status)}</p>
        }
        .into_view(),
    }
}

#[component]
fn Report(id: i64, destiny: LifeDestinyResult) -> impl IntoView {
    let LifeDestinyResult {
        chart_data,
        analysis,
    } = destiny;
    let points = Signal::derive(move || chart_data.clone());

    view! {
        <div class="flex flex-col gap-6 mb-6">
            <p class="text-sm text-gray-500">{format!("分析任务 ID：{}", id)}</p>

            {(!analysis.bazi.is_empty()).then(|| view! {
                <div class="flex justify-center gap-3">
                    {analysis.bazi.iter().map(|p| view! {
                        <span class="px-3 py-1.5 bg-gray-100 rounded-lg text-lg font-bold">{p.clone()}</span>
                    }).collect_view()}
                </div>
            })}

            <LifeKLineChart data=points />

            <div class="grid md:grid-cols-2 gap-4">
                {analysis.sections().into_iter().map(|section| view! {
                    <SectionCard
                        title=section.title
                        text=section.text.to_string()
                        score=section.score
                    />
                }).collect_view()}
            </div>

            {(!analysis.crypto_year.is_empty() || !analysis.crypto_style.is_empty()).then(|| view! {
                <div class="bg-amber-50 border border-amber-200 rounded-xl p-4 text-sm text-amber-900">
                    <p>{format!("暴富流年：{}", analysis.crypto_year)}</p>
                    <p>{format!("交易风格：{}", analysis.crypto_style)}</p>
                </div>
            })}
        </div>
    }
}

#[component]
fn SectionCard(title: &'static str, text: String, score: f64) -> impl IntoView {
    view! {
        <div class="bg-white rounded-xl border border-gray-200 p-4 shadow-sm">
            <div class="flex justify-between items-center mb-2">
                <h3 class="font-bold text-gray-800">{title}</h3>
                <span class="text-sm font-mono text-indigo-600">{format!("{}/10", score)}</span>
            </div>
            <div class="h-1.5 bg-gray-100 rounded-full mb-3 overflow-hidden">
                <div
                    class="h-full bg-gradient-to-r from-indigo-400 to-rose-500"
                    style=format!("width: {}%", score_percent(score))
                />
            </div>
            <p class="text-sm text-gray-700 leading-relaxed whitespace-pre-line">{text}</p>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_percent_clamps() {
        assert_eq!(score_percent(7.5), 75.0);
        assert_eq!(score_percent(-3.0), 0.0);
        assert_eq!(score_percent(12.0), 100.0);
        assert_eq!(score_percent(f64::NAN), 0.0);
    }
}
