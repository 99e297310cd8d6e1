//! Fund holdings from the Eastmoney fund F10 archive.
//!
//! The archive answers with a JavaScript assignment whose `content` field is an
//! HTML fragment: one `<div class='box'>` per disclosure quarter, each with a
//! label such as `2024年1季度股票投资明细` and a table of holdings. The last
//! three columns of every holdings row are weight (percent of net value),
//! shares held and market value; earlier columns vary between layouts.

use crate::code::clean_holding_code;
use crate::error::{DataError, Result};
use crate::model::{HoldingEntry, Quarter};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

static CONTENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)content:\s*"(.*?)",\s*arryear"#).expect("content pattern is valid")
});
static BOX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<div class=['"]box['"]>"#).expect("box pattern is valid")
});
static ROW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<tr[^>]*>(.*?)</tr>").expect("row pattern is valid"));
static CELL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<td[^>]*>(.*?)</td>").expect("cell pattern is valid"));
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("tag pattern is valid"));

/// Parse a fund archive response into holdings for every quarter it lists.
///
/// Rows with a zero weight or an unusable code are dropped.
pub fn parse_fund_holdings(etf_code: &str, body: &str) -> Result<Vec<HoldingEntry>> {
    let content = CONTENT_RE
        .captures(body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| {
            DataError::Provider(format!("holdings response for {} has no content", etf_code))
        })?;

    let mut entries = Vec::new();
    for section in BOX_RE.split(content).skip(1) {
        let Some(quarter) = Quarter::parse_label(section) else {
            debug!(etf_code, "holdings section without quarter label");
            continue;
        };

        for row in ROW_RE.captures_iter(section) {
            let cells: Vec<String> = CELL_RE
                .captures_iter(&row[1])
                .map(|c| cell_text(&c[1]))
                .collect();
            if let Some(entry) = entry_from_cells(etf_code, quarter, &cells) {
                entries.push(entry);
            }
        }
    }

    Ok(entries)
}

fn entry_from_cells(etf_code: &str, quarter: Quarter, cells: &[String]) -> Option<HoldingEntry> {
    let n = cells.len();
    if n < 6 {
        return None;
    }
    let code = clean_holding_code(&cells[1])?;
    let weight = parse_number(&cells[n - 3])? / 100.0;
    if weight <= 0.0 {
        return None;
    }

    Some(HoldingEntry {
        etf_code: etf_code.to_string(),
        quarter,
        constituent_code: code,
        constituent_name: cells[2].clone(),
        weight,
        shares: parse_number(&cells[n - 2]),
        market_value: parse_number(&cells[n - 1]),
    })
}

fn cell_text(html: &str) -> String {
    TAG_RE
        .replace_all(html, "")
        .replace("&nbsp;", " ")
        .trim()
        .to_string()
}

fn parse_number(text: &str) -> Option<f64> {
    text.trim_end_matches('%')
        .replace(',', "")
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const BODY: &str = "var apidata={ content:\"\
<div class='box'><div class='boxitem w790'><h4 class='t'><label class='left'>\
<a href='#'>沪深300ETF</a>&nbsp;&nbsp;2024年2季度股票投资明细</label></h4>\
<table class='w782 comm tzxq'><thead><tr><th>序号</th><th>股票代码</th><th>股票名称</th>\
<th>最新价</th><th>涨跌幅</th><th>相关资讯</th><th>占净值比例</th><th>持股数（万股）</th>\
<th>持仓市值（万元）</th></tr></thead><tbody>\
<tr><td>1</td><td><a href='#'>600519</a></td><td class='tol'><a href='#'>贵州茅台</a></td>\
<td class='tor'><span></span></td><td class='tor'><span></span></td><td>变动</td>\
<td class='tor'>5.12%</td><td class='tor'>1,234.56</td><td class='tor'>2,000,000.00</td></tr>\
<tr><td>2</td><td><a href='#'>000001</a></td><td class='tol'>平安银行</td>\
<td></td><td></td><td></td><td class='tor'>0.00%</td><td>1.00</td><td>2.00</td></tr>\
</tbody></table></div></div>\
<div class='box'><div class='boxitem w790'><h4 class='t'><label class='left'>\
2024年1季度股票投资明细</label></h4><table><tbody>\
<tr><td>1</td><td>300750</td><td>宁德时代</td><td>3.20%</td><td>10.00</td><td>50.00</td></tr>\
</tbody></table></div></div>\
\",arryear:[2024,2023],curyear:2024};";

    #[test]
    fn test_parse_fund_holdings() {
        let entries = parse_fund_holdings("510300", BODY).unwrap();
        assert_eq!(entries.len(), 2);

        let first = &entries[0];
        assert_eq!(first.quarter, Quarter::new(2024, 2).unwrap());
        assert_eq!(first.constituent_code, "600519");
        assert_eq!(first.constituent_name, "贵州茅台");
        assert_relative_eq!(first.weight, 0.0512, epsilon = 1e-12);
        assert_eq!(first.shares, Some(1234.56));
        assert_eq!(first.market_value, Some(2_000_000.0));

        let second = &entries[1];
        assert_eq!(second.quarter, Quarter::new(2024, 1).unwrap());
        assert_eq!(second.constituent_code, "300750");
        assert_eq!(second.etf_code, "510300");
    }

    #[test]
    fn test_empty_content() {
        let body = "var apidata={ content:\"\",arryear:[],curyear:2024};";
        assert!(parse_fund_holdings("510300", body).unwrap().is_empty());
    }

    #[test]
    fn test_unexpected_body() {
        assert!(matches!(
            parse_fund_holdings("510300", "<html>blocked</html>"),
            Err(DataError::Provider(_))
        ));
    }
}
