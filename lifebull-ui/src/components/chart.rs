//! Life K-Line Chart
//!
//! One candle per year of age on an HTML5 canvas: da-yun boundaries as dashed
//! reference lines, the peak year marked with a star and its value.

use leptos::*;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent};

use lifebull::chart::{da_yun_changes, is_up, max_high, peak_indices};
use lifebull::models::KLinePoint;
use lifebull::ChartLayout;

const CANVAS_WIDTH: f64 = 800.0;
const CANVAS_HEIGHT: f64 = 440.0;

const GRID_COLOR: &str = "#f3f4f6";
const AXIS_COLOR: &str = "#e5e7eb";
const TICK_COLOR: &str = "#6b7280";
const AXIS_LABEL_COLOR: &str = "#9ca3af";
const DA_YUN_LINE_COLOR: &str = "#cbd5e1";
const DA_YUN_LABEL_COLOR: &str = "#6366f1";
const PEAK_FILL: &str = "#ef4444";
const PEAK_STROKE: &str = "#b91c1c";

const STAR_RADIUS: f64 = 6.0;

/// Vertices of a five-pointed star centred on `(cx, cy)`, top point first
pub fn star_points(cx: f64, cy: f64, outer: f64) -> Vec<(f64, f64)> {
    let inner = outer * 0.5;
    (0..10)
        .map(|i| {
            let radius = if i % 2 == 0 { outer } else { inner };
            let angle = -std::f64::consts::FRAC_PI_2 + i as f64 * std::f64::consts::PI / 5.0;
            (cx + radius * angle.cos(), cy + radius * angle.sin())
        })
        .collect()
}

#[component]
pub fn LifeKLineChart(#[prop(into)] data: Signal<Vec<KLinePoint>>) -> impl IntoView {
    let canvas_ref = create_node_ref::<html::Canvas>();
    let hovered = create_rw_signal(None::<usize>);

    create_effect(move |_| {
        let points = data.get();
        if let Some(canvas) = canvas_ref.get() {
            draw_chart(&canvas, &points);
        }
    });

    let on_move = move |ev: MouseEvent| {
        let Some(canvas) = canvas_ref.get_untracked() else {
            return;
        };
        let client_width = canvas.client_width() as f64;
        if client_width <= 0.0 {
            return;
        }
        let x = ev.offset_x() as f64 * canvas.width() as f64 / client_width;
        let index = data.with_untracked(|points| {
            ChartLayout::new(CANVAS_WIDTH, CANVAS_HEIGHT, points).index_at(x)
        });
        hovered.set(index);
    };

    view! {
        <div class="w-full bg-white p-2 md:p-6 rounded-xl border border-gray-200 shadow-sm relative">
            <div class="mb-4 flex justify-between items-center px-2">
                <h3 class="text-xl font-bold text-gray-800">"人生流年大运K线图"</h3>
                <ChartLegend />
            </div>

            {move || {
                if data.with(Vec::is_empty) {
                    view! {
                        <div class="h-[440px] flex items-center justify-center text-gray-400">"无数据"</div>
                    }.into_view()
                } else {
                    view! {}.into_view()
                }
            }}

            <div class="relative" class:hidden=move || data.with(Vec::is_empty)>
                <canvas
                    node_ref=canvas_ref
                    width=CANVAS_WIDTH.to_string()
                    height=CANVAS_HEIGHT.to_string()
                    class="w-full h-[440px]"
                    on:mousemove=on_move
                    on:mouseleave=move |_| hovered.set(None)
                />
                {move || {
                    hovered
                        .get()
                        .and_then(|i| data.with(|points| points.get(i).cloned()))
                        .map(|point| view! { <ChartTooltip point=point /> })
                }}
            </div>
        </div>
    }
}

#[component]
fn ChartLegend() -> impl IntoView {
    view! {
        <div class="flex gap-3 text-xs font-medium">
            <span class="flex items-center text-green-700 bg-green-50 px-2 py-1 rounded">
                <span class="w-2 h-2 bg-green-500 mr-2 rounded-full" />
                "吉运 (涨)"
            </span>
            <span class="flex items-center text-red-700 bg-red-50 px-2 py-1 rounded">
                <span class="w-2 h-2 bg-red-500 mr-2 rounded-full" />
                "凶运 (跌)"
            </span>
        </div>
    }
}

/// Detail card for the candle under the cursor
#[component]
fn ChartTooltip(point: KLinePoint) -> impl IntoView {
    let up = is_up(&point);
    let badge = if up {
        "text-base font-bold px-2 py-1 rounded bg-green-100 text-green-700"
    } else {
        "text-base font-bold px-2 py-1 rounded bg-red-100 text-red-700"
    };
    let da_yun = point.da_yun.clone().unwrap_or_else(|| "未知".to_string());

    view! {
        <div class="absolute top-2 right-2 bg-white/95 p-5 rounded-xl shadow-2xl border border-gray-200 z-50 w-[320px] md:w-[400px] pointer-events-none">
            <div class="flex justify-between items-start mb-3 border-b border-gray-100 pb-2">
                <div>
                    <p class="text-xl font-bold text-gray-800">
                        {format!("{} {}年 ", point.year, point.gan_zhi)}
                        <span class="text-base text-gray-500">{format!("({}岁)", point.age)}</span>
                    </p>
                    <p class="text-sm text-indigo-600 font-medium mt-1">{format!("大运：{}", da_yun)}</p>
                </div>
                <div class=badge>{if up { "吉 ▲" } else { "凶 ▼" }}</div>
            </div>
            <div class="grid grid-cols-4 gap-2 text-xs text-gray-500 mb-4 bg-gray-50 p-2 rounded">
                <PriceCell label="开盘" value=point.open />
                <PriceCell label="收盘" value=point.close />
                <PriceCell label="最高" value=point.high />
                <PriceCell label="最低" value=point.low />
            </div>
            <div class="text-sm text-gray-700 leading-relaxed max-h-[200px] overflow-y-auto">
                {point.reason}
            </div>
        </div>
    }
}

#[component]
fn PriceCell(label: &'static str, value: f64) -> impl IntoView {
    view! {
        <div class="text-center">
            <span class="block">{label}</span>
            <span class="font-mono text-gray-700 font-bold">{value.to_string()}</span>
        </div>
    }
}

fn dash(segments: &[f64]) -> js_sys::Array {
    segments.iter().map(|s| JsValue::from_f64(*s)).collect()
}

fn draw_chart(canvas: &HtmlCanvasElement, points: &[KLinePoint]) {
    let ctx = match canvas.get_context("2d") {
        Ok(Some(ctx)) => ctx,
        _ => return,
    };
    let ctx: CanvasRenderingContext2d = match ctx.dyn_into() {
        Ok(ctx) => ctx,
        Err(_) => return,
    };

    let width = canvas.width() as f64;
    let height = canvas.height() as f64;
    ctx.clear_rect(0.0, 0.0, width, height);

    if points.is_empty() {
        return;
    }

    let layout = ChartLayout::new(width, height, points);
    let left = layout.margins.left;
    let right = width - layout.margins.right;
    let bottom = layout.y(0.0);

    // Horizontal grid and y-axis ticks
    ctx.set_font("10px sans-serif");
    ctx.set_line_width(1.0);
    let _ = ctx.set_line_dash(&dash(&[3.0, 3.0]));
    for tick in layout.y_ticks(5) {
        let y = layout.y(tick);
        ctx.set_stroke_style(&GRID_COLOR.into());
        ctx.begin_path();
        ctx.move_to(left, y);
        ctx.line_to(right, y);
        ctx.stroke();

        ctx.set_fill_style(&TICK_COLOR.into());
        ctx.set_text_align("right");
        let _ = ctx.fill_text(&format!("{}", tick), left - 6.0, y + 3.0);
    }

    // Da-yun reference lines
    for marker in da_yun_changes(points) {
        let x = layout.x_center(marker.index);
        ctx.set_stroke_style(&DA_YUN_LINE_COLOR.into());
        ctx.begin_path();
        ctx.move_to(x, layout.margins.top);
        ctx.line_to(x, bottom);
        ctx.stroke();

        if !marker.label.is_empty() {
            ctx.set_fill_style(&DA_YUN_LABEL_COLOR.into());
            ctx.set_font("bold 10px sans-serif");
            ctx.set_text_align("center");
            let _ = ctx.fill_text(&marker.label, x, layout.margins.top - 8.0);
            ctx.set_font("10px sans-serif");
        }
    }
    let _ = ctx.set_line_dash(&js_sys::Array::new());

    // X axis
    ctx.set_stroke_style(&AXIS_COLOR.into());
    ctx.begin_path();
    ctx.move_to(left, bottom);
    ctx.line_to(right, bottom);
    ctx.stroke();

    // Candles
    for (i, point) in points.iter().enumerate() {
        let candle = layout.candle(i, point);

        ctx.set_stroke_style(&candle.stroke().into());
        ctx.set_line_width(2.0);
        ctx.begin_path();
        ctx.move_to(candle.center_x, candle.wick_top);
        ctx.line_to(candle.center_x, candle.wick_bottom);
        ctx.stroke();

        ctx.set_fill_style(&candle.fill().into());
        ctx.fill_rect(candle.body_x, candle.body_top, candle.body_width, candle.body_height);
        ctx.set_line_width(1.0);
        ctx.stroke_rect(candle.body_x, candle.body_top, candle.body_width, candle.body_height);
    }

    // Peak star and value
    let peak = max_high(points);
    for i in peak_indices(points) {
        let x = layout.x_center(i);
        let top = layout.y(peak);
        let star = star_points(x, top - 18.0, STAR_RADIUS);

        ctx.begin_path();
        for (n, (sx, sy)) in star.iter().enumerate() {
            if n == 0 {
                ctx.move_to(*sx, *sy);
            } else {
                ctx.line_to(*sx, *sy);
            }
        }
        ctx.close_path();
        ctx.set_fill_style(&PEAK_FILL.into());
        ctx.fill();
        ctx.set_stroke_style(&PEAK_STROKE.into());
        ctx.set_line_width(1.0);
        ctx.stroke();

        ctx.set_fill_style(&PEAK_STROKE.into());
        ctx.set_font("bold 10px sans-serif");
        ctx.set_text_align("center");
        let _ = ctx.fill_text(&format!("{}", peak), x, top - 28.0);
    }

    // Age labels and axis titles
    ctx.set_font("10px sans-serif");
    ctx.set_fill_style(&TICK_COLOR.into());
    ctx.set_text_align("center");
    for (x, age) in layout.age_labels(points) {
        let _ = ctx.fill_text(&age.to_string(), x, bottom + 14.0);
    }

    ctx.set_fill_style(&AXIS_LABEL_COLOR.into());
    ctx.set_text_align("right");
    let _ = ctx.fill_text("年龄", right, height - 4.0);

    ctx.save();
    let _ = ctx.translate(12.0, layout.margins.top + layout.plot_height() / 2.0);
    let _ = ctx.rotate(-std::f64::consts::FRAC_PI_2);
    ctx.set_text_align("center");
    let _ = ctx.fill_text("运势分", 0.0, 0.0);
    ctx.restore();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_star_points_top_first() {
        let points = star_points(100.0, 50.0, 6.0);
        assert_eq!(points.len(), 10);
        let (x, y) = points[0];
        assert!((x - 100.0).abs() < 1e-9);
        assert!((y - 44.0).abs() < 1e-9);
    }

    #[test]
    fn test_star_points_alternate_radius() {
        let points = star_points(0.0, 0.0, 10.0);
        for (i, (x, y)) in points.iter().enumerate() {
            let r = (x * x + y * y).sqrt();
            let expected = if i % 2 == 0 { 10.0 } else { 5.0 };
            assert!((r - expected).abs() < 1e-9, "vertex {} radius {}", i, r);
        }
    }
}
