//! Terminal Rendering
//!
//! Plain-text views of the user summary, the bazi preview and a finished
//! analysis, including a character-cell K-line chart. Each candle takes one
//! column; rows come from the same [`ChartLayout`] the canvas uses.

use std::fmt::Write as _;

use crate::chart::{da_yun_changes, peak_indices, ChartLayout, Margins};
use crate::models::{AnalysisDetail, AnalysisStatus, BaziResult, KLinePoint, UserMeResponse};

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

const UP_BODY: char = '█';
const DOWN_BODY: char = '▓';
const WICK: char = '│';
const PEAK: char = '★';

/// Width of the y-axis label gutter
const GUTTER: usize = 5;

/// Ten-cell score bar, e.g. `███████░░░ 7/10`
pub fn score_bar(score: f64) -> String {
    let filled = if score.is_finite() {
        score.round().clamp(0.0, 10.0) as usize
    } else {
        0
    };
    format!(
        "{}{} {}/10",
        "█".repeat(filled),
        "░".repeat(10 - filled),
        format_number(score)
    )
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.1}", value)
    }
}

/// Account, quota and referral summary
pub fn render_user(me: &UserMeResponse) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "手机号:       {}", me.user.phone);
    let _ = writeln!(out, "我的邀请码:   {}", me.user.referral_code);
    if let Some(inviter) = me.user.inviter_code.as_deref().filter(|c| !c.is_empty()) {
        let _ = writeln!(out, "邀请人:       {}", inviter);
    }
    let _ = writeln!(
        out,
        "今日剩余次数: {} / {}",
        me.today_remaining,
        me.today_total_quota()
    );
    let _ = writeln!(
        out,
        "已邀请:       {} 人 (今日 {} 人)",
        me.total_invited, me.invited_today
    );
    let _ = writeln!(out, "我的专属链接: {}", me.my_referral_url);
    out
}

/// Four pillars, lunar date, start age and da-yun sequence
pub fn render_bazi_preview(analysis_id: i64, bazi: Option<&BaziResult>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "分析任务 ID: {}", analysis_id);

    let Some(bazi) = bazi else {
        let _ = writeln!(out, "(本地没有该任务的排盘缓存)");
        return out;
    };

    let _ = writeln!(out, "{}", bazi.user_input.gender.chart_label());
    if !bazi.lunar_date.is_empty() {
        let _ = writeln!(out, "农历: {}", bazi.lunar_date);
    }
    if !bazi.solar_time.is_empty() {
        let _ = writeln!(out, "真太阳时: {}", bazi.solar_time);
    }

    let pillars = bazi.bazi.pillars();
    let names: Vec<&str> = pillars.iter().map(|(name, _)| *name).collect();
    let labels: Vec<String> = pillars.iter().map(|(_, p)| p.label()).collect();
    let _ = writeln!(out, "{}", names.join("  "));
    let _ = writeln!(out, "{}", labels.join("  "));

    let _ = writeln!(
        out,
        "起运: {} 岁 ({})",
        bazi.start_age,
        if bazi.is_forward() { "顺行" } else { "逆行" }
    );
    if !bazi.da_yun.is_empty() {
        let _ = writeln!(out, "大运: {}", bazi.da_yun.join(" → "));
    }
    out
}

/// Status line, or the full report once the job is done
pub fn render_analysis(detail: &AnalysisDetail, chart: &AsciiChart) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "人生牛市 · 分析结果 (ID: {})", detail.id);

    match &detail.status {
        AnalysisStatus::Pending => {
            let _ = writeln!(out, "大师推演中（约 3–5 分钟），请稍候...");
        }
        AnalysisStatus::Error => {
            let _ = writeln!(
                out,
                "分析失败：{}",
                detail.error_message.as_deref().unwrap_or_default()
            );
        }
        AnalysisStatus::Other(status) => {
            let _ = writeln!(out, "未知状态: {}", status);
        }
        AnalysisStatus::Done => match detail.destiny() {
            None => {
                let _ = writeln!(out, "分析已完成，但结果为空");
            }
            Some(destiny) => {
                let analysis = &destiny.analysis;
                if !analysis.bazi.is_empty() {
                    let _ = writeln!(out, "八字: {}", analysis.bazi.join(" "));
                }
                for section in analysis.sections() {
                    let _ = writeln!(out);
                    let _ = writeln!(out, "【{}】 {}", section.title, score_bar(section.score));
                    if !section.text.is_empty() {
                        let _ = writeln!(out, "  {}", section.text);
                    }
                }
                if !analysis.crypto_year.is_empty() {
                    let _ = writeln!(out, "  暴富流年: {}", analysis.crypto_year);
                }
                if !analysis.crypto_style.is_empty() {
                    let _ = writeln!(out, "  交易风格: {}", analysis.crypto_style);
                }

                let _ = writeln!(out);
                let _ = writeln!(out, "人生流年大运K线图");
                out.push_str(&chart.render(&destiny.chart_data));
            }
        },
    }
    out
}

/// Character-cell candlestick renderer
#[derive(Debug, Clone)]
pub struct AsciiChart {
    pub rows: usize,
    pub color: bool,
}

impl Default for AsciiChart {
    fn default() -> Self {
        Self {
            rows: 16,
            color: false,
        }
    }
}

#[derive(Clone, Copy)]
struct Cell {
    ch: char,
    up: Option<bool>,
}

const BLANK: Cell = Cell { ch: ' ', up: None };

impl AsciiChart {
    pub fn new(rows: usize, color: bool) -> Self {
        Self {
            rows: rows.max(4),
            color,
        }
    }

    pub fn render(&self, points: &[KLinePoint]) -> String {
        if points.is_empty() {
            return "无数据\n".to_string();
        }

        let rows = self.rows.max(4);
        // One extra row on top for the peak marker
        let layout = ChartLayout::with_margins(
            points.len() as f64,
            (rows + 1) as f64,
            Margins {
                top: 1.0,
                right: 0.0,
                bottom: 0.0,
                left: 0.0,
            },
            points,
        );
        let total_rows = rows + 1;
        let mut grid = vec![vec![BLANK; points.len()]; total_rows];
        let last_row = total_rows as f64 - 0.5;

        for (col, point) in points.iter().enumerate() {
            let candle = layout.candle(col, point);
            let body_top = layout.y(point.open.max(point.close)).min(last_row);
            let body_bottom = layout.y(point.open.min(point.close)).min(last_row);
            let wick_top = candle.wick_top.min(last_row);
            let wick_bottom = candle.wick_bottom.min(last_row);

            for (row, line) in grid.iter_mut().enumerate() {
                if covers(body_top, body_bottom, row) {
                    line[col] = Cell {
                        ch: if candle.up { UP_BODY } else { DOWN_BODY },
                        up: Some(candle.up),
                    };
                } else if covers(wick_top, wick_bottom, row) {
                    line[col] = Cell {
                        ch: WICK,
                        up: Some(candle.up),
                    };
                }
            }
        }

        for index in peak_indices(points) {
            let wick_row = layout.y(points[index].high).min(last_row) as usize;
            let row = wick_row.saturating_sub(1);
            grid[row][index] = Cell { ch: PEAK, up: None };
        }

        let mut out = String::new();
        for (row, line) in grid.iter().enumerate() {
            let label = if row == 1 {
                format_number(layout.y_max)
            } else if row == total_rows - 1 {
                "0".to_string()
            } else {
                String::new()
            };
            let _ = write!(out, "{:>width$} ┤", label, width = GUTTER - 1);
            for cell in line {
                self.push_cell(&mut out, *cell);
            }
            out.push('\n');
        }

        let _ = writeln!(out, "{}└{}", " ".repeat(GUTTER), "─".repeat(points.len()));

        let changes = da_yun_changes(points);
        let mut markers = vec![' '; points.len()];
        for change in &changes {
            markers[change.index] = '┬';
        }
        let _ = writeln!(out, "{} {}", " ".repeat(GUTTER), markers.iter().collect::<String>());
        let _ = writeln!(out, "{} {}", " ".repeat(GUTTER), age_axis(&layout, points));

        let legend: Vec<String> = changes
            .iter()
            .filter(|c| !c.label.is_empty())
            .map(|c| format!("{}岁 {}", c.age, c.label))
            .collect();
        if !legend.is_empty() {
            let _ = writeln!(out, "大运: {}", legend.join(" | "));
        }
        if self.color {
            let _ = writeln!(out, "{}{}{} 吉运 (涨)  {}{}{} 凶运 (跌)", GREEN, UP_BODY, RESET, RED, DOWN_BODY, RESET);
        } else {
            let _ = writeln!(out, "{} 吉运 (涨)  {} 凶运 (跌)", UP_BODY, DOWN_BODY);
        }
        out
    }

    fn push_cell(&self, out: &mut String, cell: Cell) {
        match (self.color, cell.up) {
            (true, Some(up)) => {
                out.push_str(if up { GREEN } else { RED });
                out.push(cell.ch);
                out.push_str(RESET);
            }
            _ => out.push(cell.ch),
        }
    }
}

/// Whether the pixel span `[top, bottom]` touches row `row`
fn covers(top: f64, bottom: f64, row: usize) -> bool {
    let row = row as f64;
    top < row + 1.0 && bottom >= row
}

/// Age numbers written under every labelled column
fn age_axis(layout: &ChartLayout, points: &[KLinePoint]) -> String {
    let mut axis = vec![' '; points.len()];
    for (x, age) in layout.age_labels(points) {
        let start = x.floor() as usize;
        for (offset, ch) in age.to_string().chars().enumerate() {
            if let Some(slot) = axis.get_mut(start + offset) {
                *slot = ch;
            }
        }
    }
    axis.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisInput, BasicProfileInput, BaziChart, BaziPillar, Gender, UserMe};
    use serde_json::json;

    fn point(age: u32, da_yun: &str, open: f64, close: f64, high: f64, low: f64) -> KLinePoint {
        KLinePoint {
            age,
            year: 2000 + age as i32,
            da_yun: Some(da_yun.to_string()),
            open,
            close,
            high,
            low,
            score: close,
            ..Default::default()
        }
    }

    fn detail(status: &str, output: Option<serde_json::Value>) -> AnalysisDetail {
        AnalysisDetail {
            id: 7,
            status: AnalysisStatus::from(status.to_string()),
            input: AnalysisInput::default(),
            output,
            error_message: Some("LLM 超时".to_string()),
            created_at: String::new(),
            completed_at: None,
        }
    }

    #[test]
    fn test_score_bar() {
        assert_eq!(score_bar(7.0), "███████░░░ 7/10");
        assert_eq!(score_bar(6.5), "███████░░░ 6.5/10");
        assert_eq!(score_bar(-3.0), "░░░░░░░░░░ -3/10");
        assert_eq!(score_bar(12.0), "██████████ 12/10");
    }

    #[test]
    fn test_chart_glyphs_and_markers() {
        let points = vec![
            point(1, "童限", 50.0, 60.0, 65.0, 45.0),
            point(2, "童限", 60.0, 40.0, 62.0, 35.0),
            point(3, "辛酉", 40.0, 80.0, 90.0, 38.0),
        ];
        let text = AsciiChart::new(10, false).render(&points);
        let lines: Vec<&str> = text.lines().collect();

        assert!(text.contains(UP_BODY));
        assert!(text.contains(DOWN_BODY));
        assert!(text.contains(WICK));
        assert_eq!(text.matches(PEAK).count(), 1);
        assert!(lines[1].trim_start().starts_with("100"));
        assert!(text.contains("┬ ┬"));
        assert!(text.contains("大运: 1岁 童限 | 3岁 辛酉"));
        assert!(!text.contains('\x1b'));
    }

    #[test]
    fn test_chart_empty_and_color() {
        assert_eq!(AsciiChart::default().render(&[]), "无数据\n");

        let colored = AsciiChart::new(6, true).render(&[point(1, "童限", 10.0, 20.0, 25.0, 5.0)]);
        assert!(colored.contains(&format!("{}{}{}", GREEN, UP_BODY, RESET)));
        assert!(!colored.contains(&format!("{}{}{}", RED, WICK, RESET)));
    }

    #[test]
    fn test_bazi_preview() {
        let bazi = BaziResult {
            user_input: BasicProfileInput {
                gender: Gender::Female,
                ..Default::default()
            },
            solar_time: "04:30".to_string(),
            lunar_date: "癸未年九月十七".to_string(),
            bazi: BaziChart {
                year: BaziPillar { gan: "癸".into(), zhi: "未".into(), element: None },
                month: BaziPillar { gan: "壬".into(), zhi: "戌".into(), element: None },
                day: BaziPillar { gan: "丙".into(), zhi: "子".into(), element: None },
                hour: BaziPillar { gan: "庚".into(), zhi: "寅".into(), element: None },
            },
            start_age: 8,
            direction: "Backward".to_string(),
            da_yun: vec!["辛酉".to_string(), "庚申".to_string()],
        };

        let text = render_bazi_preview(42, Some(&bazi));
        assert!(text.contains("分析任务 ID: 42"));
        assert!(text.contains("坤造"));
        assert!(text.contains("癸未  壬戌  丙子  庚寅"));
        assert!(text.contains("起运: 8 岁 (逆行)"));
        assert!(text.contains("辛酉 → 庚申"));

        assert!(render_bazi_preview(42, None).contains("排盘缓存"));
    }

    #[test]
    fn test_analysis_states() {
        let chart = AsciiChart::default();
        assert!(render_analysis(&detail("pending", None), &chart).contains("大师推演中"));
        assert!(render_analysis(&detail("error", None), &chart).contains("分析失败：LLM 超时"));

        let done = detail(
            "done",
            Some(json!({
                "summary": "先抑后扬",
                "summaryScore": 8,
                "cryptoStyle": "现货定投",
                "chartPoints": [{"age": 1, "open": 50, "close": 55, "high": 60, "low": 45}]
            })),
        );
        let text = render_analysis(&done, &chart);
        assert!(text.contains("【命理总评】 ████████░░ 8/10"));
        assert!(text.contains("先抑后扬"));
        assert!(text.contains("交易风格: 现货定投"));
        assert!(text.contains("人生流年大运K线图"));
        assert!(text.contains(UP_BODY));
    }

    #[test]
    fn test_user_summary() {
        let me = UserMeResponse {
            user: UserMe {
                phone: "13900000001".to_string(),
                referral_code: "ABC123".to_string(),
                ..Default::default()
            },
            today_base_quota: 5,
            today_extra_quota: 1,
            today_remaining: 4,
            my_referral_url: "http://localhost:5173/auth?ref=ABC123".to_string(),
            ..Default::default()
        };
        let text = render_user(&me);
        assert!(text.contains("今日剩余次数: 4 / 6"));
        assert!(text.contains("ref=ABC123"));
        assert!(!text.contains("邀请人"));
    }
}
