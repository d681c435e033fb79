//! Server-rendered HTML for the home, investment profile and results pages.

use maud::{html, Markup, PreEscaped, DOCTYPE};
use robo_core::domain::inputs::{
    Currency, RecommendationForm, RiskProfile, MAX_INVESTABLE_AMOUNT, MAX_TIME_HORIZON_YEARS,
    MAX_YEARLY_LOSS_PCT, MIN_INVESTABLE_AMOUNT, MIN_TIME_HORIZON_YEARS, MIN_YEARLY_LOSS_PCT,
};
use robo_core::results::{format_thousands, AllocationRow, Projection, ResultsView, Slice};
use robo_core::session::{Flash, FlashKind, Page, SessionContext};

const STYLE: &str = r#"
body { font-family: sans-serif; margin: 0; display: flex; color: #222; }
nav.sidebar { width: 220px; min-height: 100vh; background: #f0f2f6; padding: 1rem; box-sizing: border-box; }
nav.sidebar form { margin: 0 0 .5rem 0; }
nav.sidebar button { width: 100%; }
main { flex: 1; padding: 2rem; max-width: 1100px; }
.main-header { font-size: 3rem; font-weight: bold; text-align: center; color: #1f77b4; margin-bottom: 1rem; }
.sub-header { font-size: 1.2rem; text-align: center; color: #666; margin-bottom: 2rem; }
button { background: #1f77b4; color: white; font-size: 1.05rem; padding: .5rem; border: 0; border-radius: 5px; cursor: pointer; }
button:disabled { background: #9bbbd4; cursor: not-allowed; }
.flash { padding: .75rem 1rem; border-radius: 6px; margin-bottom: 1rem; }
.flash.success { background: #e3f6e8; } .flash.warning { background: #fff4d6; } .flash.error { background: #fde2e2; }
.flash.info { background: #e8f1fb; }
.metrics { display: flex; gap: 1rem; }
.metric-card { flex: 1; background: #f0f2f6; padding: 1rem; border-radius: 10px; border-left: 5px solid #1f77b4; }
.metric-card .value { font-size: 1.6rem; }
.badge { padding: 1rem; border-radius: 10px; color: white; text-align: center; margin: 1rem 0; }
.commentary { background: #e8f1fb; padding: 1rem; border-radius: 6px; }
table { border-collapse: collapse; width: 100%; }
th, td { border-bottom: 1px solid #ddd; padding: .4rem; text-align: left; }
.charts { display: flex; gap: 2rem; }
.donut { width: 220px; height: 220px; border-radius: 50%; position: relative; }
.donut::after { content: ""; position: absolute; inset: 25%; background: white; border-radius: 50%; }
.legend span.swatch { display: inline-block; width: .8rem; height: .8rem; margin-right: .4rem; }
form.profile label { display: block; margin-top: .8rem; }
form.profile .cols { display: flex; gap: 2rem; }
form.profile .cols > div { flex: 1; }
"#;

const PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

const PENDING_MESSAGE: &str =
    "⏳ Analyzing market conditions and generating your personalized portfolio...";

// Browser-side half of the pending state; the server keeps the other half.
const ON_SUBMIT: &str = "this.querySelector('#generate').disabled = true; \
document.getElementById('pending').hidden = false;";

pub fn render(session: &SessionContext, flash: Option<Flash>) -> String {
    let body = match session.page() {
        Page::Home => home_page(),
        Page::Input => input_page(session.form(), session.is_pending()),
        Page::Results => match session.recommendation() {
            Some(rec) => results_page(&ResultsView::build(rec)),
            None => missing_results_page(),
        },
    };
    layout(session, flash.as_ref(), body).into_string()
}

fn flash_class(kind: FlashKind) -> &'static str {
    match kind {
        FlashKind::Success => "flash success",
        FlashKind::Warning => "flash warning",
        FlashKind::Error => "flash error",
    }
}

fn layout(session: &SessionContext, flash: Option<&Flash>, body: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                title { "ROBO ADVISOR" }
                style { (PreEscaped(STYLE)) }
            }
            body {
                (sidebar(session))
                main {
                    @if let Some(flash) = flash {
                        div class=(flash_class(flash.kind)) { (flash.message) }
                    }
                    (body)
                }
            }
        }
    }
}

fn sidebar(session: &SessionContext) -> Markup {
    html! {
        nav class="sidebar" {
            h2 { "Navigation" }
            form method="post" action="/navigate/home" {
                button type="submit" { "🏠 Home" }
            }
            form method="post" action="/navigate/input" {
                button type="submit" { "📝 Investment Profile" }
            }
            form method="post" action="/navigate/results" {
                button type="submit" id="nav-results" disabled[!session.results_enabled()] {
                    "📊 Results"
                }
            }
            hr;
            h3 { "About" }
            p {
                "This Robo Advisor uses AI to provide personalized ETF portfolio recommendations \
                 based on your investment profile."
            }
        }
    }
}

fn home_page() -> Markup {
    html! {
        div class="main-header" { "🤖 ROBO ADVISOR" }
        div class="sub-header" {
            "Robo Advisor is here to help you in planning and understanding a thoughtful way to \
             invest your savings, with a clear and simple investing through ETF and a transparent \
             risk management"
        }
        h3 { "Why Choose Our Robo Advisor?" }
        ul {
            li { "🎯 " b { "Personalized Recommendations" } ": Tailored to your risk profile and investment goals" }
            li { "📊 " b { "ETF Focus" } ": Low-cost, diversified investment options" }
            li { "🔒 " b { "Risk Management" } ": Clear understanding of potential losses" }
            li { "🌍 " b { "Multi-Currency Support" } ": Invest in your preferred currency" }
            li { "🤖 " b { "AI-Powered" } ": Leveraging advanced algorithms for optimal portfolio construction" }
        }
        form method="post" action="/start" {
            button type="submit" { "Get Started with Your Investment Plan" }
        }
    }
}

fn input_page(form: &RecommendationForm, pending: bool) -> Markup {
    html! {
        div class="main-header" { "📝 Investment Profile" }
        p { "Please provide your investment preferences to receive a personalized portfolio recommendation." }
        form class="profile" method="post" action="/recommend" onsubmit=(ON_SUBMIT) {
            div class="cols" {
                div {
                    label {
                        "Currency "
                        select name="currency" {
                            @for c in Currency::ALL {
                                option value=(c.code()) selected[c.code().eq_ignore_ascii_case(&form.currency)] {
                                    (c.code())
                                }
                            }
                        }
                    }
                    label {
                        "Investable Savings Amount (" (form.currency) ") "
                        input type="number" name="investable_amount" min=(MIN_INVESTABLE_AMOUNT.to_string())
                            max=(MAX_INVESTABLE_AMOUNT.to_string()) step="1000"
                            value=(form.investable_amount.to_string()) required;
                    }
                    label {
                        "Risk Profile "
                        select name="risk_profile" {
                            @for r in RiskProfile::ALL {
                                option value=(r.as_str()) selected[r.as_str().eq_ignore_ascii_case(&form.risk_profile)] {
                                    (r.as_str()) " (" (r.description()) ")"
                                }
                            }
                        }
                    }
                }
                div {
                    label {
                        "Maximum Yearly Loss Tolerated (%) "
                        input type="number" name="max_yearly_loss" min=(MIN_YEARLY_LOSS_PCT.to_string())
                            max=(MAX_YEARLY_LOSS_PCT.to_string()) step="1"
                            value=(form.max_yearly_loss.to_string()) required;
                    }
                    label {
                        "In how many years you plan to use your savings "
                        input type="number" name="time_horizon" min=(MIN_TIME_HORIZON_YEARS)
                            max=(MAX_TIME_HORIZON_YEARS) step="1" value=(form.time_horizon) required;
                    }
                }
            }
            div id="pending" class="flash info" hidden[!pending] { (PENDING_MESSAGE) }
            p {
                button type="submit" id="generate" disabled[pending] {
                    "🚀 Generate Investment Recommendation"
                }
            }
        }
        form method="post" action="/navigate/home" {
            button type="submit" { "← Back to Home" }
        }
    }
}

fn missing_results_page() -> Markup {
    html! {
        div class="flash warning" {
            "No portfolio data available. Please generate a recommendation first."
        }
        form method="post" action="/navigate/input" {
            button type="submit" { "Go to Input Page" }
        }
    }
}

fn results_page(view: &ResultsView) -> Markup {
    let s = &view.summary;
    let badge = &view.risk_badge;
    let horizon = view.projection.years.last().copied().unwrap_or(0);

    html! {
        div class="main-header" { "📊 Your Personalized Portfolio" }

        h3 { "🎯 Portfolio Overview" }
        div class="metrics" {
            @for (label, value) in [
                ("Risk Level", &s.risk_level),
                ("Expected Annual Return", &s.expected_annual_return),
                ("Max Expected Yearly Loss", &s.max_expected_yearly_loss),
                ("Investment Horizon", &s.investment_horizon),
            ] {
                div class="metric-card" {
                    div { (label) }
                    div class="value" { (value) }
                }
            }
        }

        div class="badge" style={ "background-color: " (badge.color) } {
            h3 { "Risk Level: " (badge.level) }
            p { "Maximum Expected Yearly Loss: " (badge.max_loss) }
        }

        h3 { "💡 Portfolio Commentary" }
        div class="commentary" { (view.commentary) }

        h3 { "📋 Asset Allocation" }
        (allocation_table(&view.allocation_table))

        details {
            summary { "📖 Asset Details" }
            @for detail in &view.asset_details {
                p {
                    b { (detail.title) }
                    br;
                    (detail.description)
                    @if let Some(link) = &detail.link {
                        br;
                        a href=(link) target="_blank" rel="noopener noreferrer" { "More information" }
                    }
                }
                hr;
            }
        }

        div class="charts" {
            div {
                h3 { "🥧 Allocation by Asset Class" }
                (donut(&view.by_asset_class))
            }
            div {
                h3 { "💱 Allocation by Currency" }
                (donut(&view.by_currency))
            }
        }

        h3 { "📈 Portfolio Value Projection" }
        p { "Portfolio Value Projection Over " (horizon) " Years (" (view.currency.code()) ")" }
        (projection_svg(&view.projection))

        p { small { "Generated " (view.generated_at.format("%Y-%m-%d %H:%M UTC").to_string()) } }
        form method="post" action="/new" {
            button type="submit" { "🔄 Generate New Recommendation" }
        }
    }
}

fn allocation_table(rows: &[AllocationRow]) -> Markup {
    html! {
        table {
            thead {
                tr {
                    @for header in AllocationRow::HEADERS {
                        th { (header) }
                    }
                }
            }
            tbody {
                @for row in rows {
                    tr {
                        @for cell in row.cells() {
                            td { (cell) }
                        }
                    }
                }
            }
        }
    }
}

/// Donut chart drawn with a CSS conic gradient, shares relative to the total.
fn donut(slices: &[Slice]) -> Markup {
    let total: f64 = slices.iter().map(|s| s.value).sum();
    let mut stops = Vec::with_capacity(slices.len());
    let mut legend = Vec::with_capacity(slices.len());
    let mut start = 0.0;

    for (i, slice) in slices.iter().enumerate() {
        let color = PALETTE[i % PALETTE.len()];
        let share = if total > 0.0 { slice.value / total * 100.0 } else { 0.0 };
        let end = start + share;
        stops.push(format!("{color} {start:.3}% {end:.3}%"));
        legend.push((color, slice.label.as_str(), share));
        start = end;
    }

    let gradient = if stops.is_empty() {
        "#ddd".to_string()
    } else {
        format!("conic-gradient({})", stops.join(", "))
    };

    html! {
        div class="donut" style={ "background: " (gradient) } {}
        ul class="legend" {
            @for (color, label, share) in legend {
                li {
                    span class="swatch" style={ "background:" (color) } {}
                    (label) " " (format!("{share:.1}%"))
                }
            }
        }
    }
}

const SVG_WIDTH: f64 = 720.0;
const SVG_HEIGHT: f64 = 320.0;
const SVG_PAD: f64 = 60.0;

fn coord(v: f64) -> String {
    format!("{v:.1}")
}

/// Expected-value line over the shaded uncertainty band.
fn projection_svg(p: &Projection) -> Markup {
    let Some(&last_year) = p.years.last() else {
        return html! {};
    };
    let min = p.lower_values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = p.upper_values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = if max > min { max - min } else { 1.0 };
    let x_span = f64::from(last_year.max(1));

    let x = |year: u32| SVG_PAD + f64::from(year) / x_span * (SVG_WIDTH - 2.0 * SVG_PAD);
    let y = |value: f64| SVG_HEIGHT - SVG_PAD - (value - min) / span * (SVG_HEIGHT - 2.0 * SVG_PAD);
    let points = |values: &mut dyn Iterator<Item = (u32, f64)>| {
        values
            .map(|(yr, v)| format!("{},{}", coord(x(yr)), coord(y(v))))
            .collect::<Vec<_>>()
            .join(" ")
    };

    let upper = p.years.iter().copied().zip(p.upper_values.iter().copied());
    let lower = p.years.iter().copied().zip(p.lower_values.iter().copied()).rev();
    let band = points(&mut upper.chain(lower));
    let base = points(&mut p.years.iter().copied().zip(p.base_values.iter().copied()));
    let axis_y = SVG_HEIGHT - SVG_PAD + 18.0;

    html! {
        svg width=(SVG_WIDTH.to_string()) height=(SVG_HEIGHT.to_string()) role="img" aria-label="Portfolio value projection" {
            polygon points=(band) fill="rgba(31, 119, 180, 0.2)" stroke="none" {
                title { "Uncertainty Range (±2%)" }
            }
            polyline points=(base) fill="none" stroke="#1f77b4" stroke-width="3" {
                title { "Expected Value" }
            }
            @for (year, value) in p.years.iter().zip(&p.base_values) {
                circle cx=(coord(x(*year))) cy=(coord(y(*value))) r="4" fill="#1f77b4" {
                    title { "Year " (year) ": " (format_thousands(*value)) }
                }
                text x=(coord(x(*year))) y=(coord(axis_y)) font-size="11" text-anchor="middle" {
                    (year)
                }
            }
            text x="4" y=(coord(y(max))) font-size="11" { (format_thousands(max)) }
            text x="4" y=(coord(y(min))) font-size="11" { (format_thousands(min)) }
            text x=(coord(SVG_WIDTH / 2.0)) y=(coord(SVG_HEIGHT - 8.0)) font-size="12" text-anchor="middle" {
                "Years"
            }
        }
    }
}
