//! Lookup of labelled stat widgets inside a container.

use scraper::ElementRef;

use crate::model::RawStatToken;
use crate::signatures::SIGNATURES;

/// Value text of the first stat widget under `container` whose label equals `label`.
///
/// Labels are compared trimmed and case-insensitively. The first widget with a matching label
/// decides the outcome, even when it carries no value element.
pub fn find_stat_value(container: ElementRef<'_>, label: &str) -> Option<String> {
    let wanted = label.trim().to_lowercase();
    container
        .select(&SIGNATURES.stat_widget)
        .find(|widget| widget_label(*widget).as_deref() == Some(wanted.as_str()))
        .and_then(|widget| first_text(widget, &SIGNATURES.stat_value))
}

/// Every label/value pair under `container`, in document order.
pub fn stat_tokens(container: ElementRef<'_>) -> Vec<RawStatToken> {
    container
        .select(&SIGNATURES.stat_widget)
        .filter_map(|widget| {
            let label = first_text(widget, &SIGNATURES.stat_label)?;
            let value = first_text(widget, &SIGNATURES.stat_value).unwrap_or_default();
            Some(RawStatToken { label, value })
        })
        .collect()
}

fn widget_label(widget: ElementRef<'_>) -> Option<String> {
    first_text(widget, &SIGNATURES.stat_label).map(|text| text.to_lowercase())
}

/// Trimmed text content of the first descendant matching `selector`.
pub(crate) fn first_text(scope: ElementRef<'_>, selector: &scraper::Selector) -> Option<String> {
    scope
        .select(selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn grid(html: &str) -> Html {
        Html::parse_fragment(&format!("<div class=\"container\">{html}</div>"))
    }

    fn root(doc: &Html) -> ElementRef<'_> {
        let sel = Selector::parse("div.container").unwrap();
        doc.select(&sel).next().unwrap()
    }

    #[test]
    fn finds_vertical_and_horizontal_widgets() {
        let doc = grid(
            r#"<div class="stat-ver"><span class="stat-name">Kills</span><span class="stat-value">1,204</span></div>
               <div class="stat-hor"><span class="stat-name">Deaths</span><span class="stat-value"> 300 </span></div>"#,
        );
        assert_eq!(find_stat_value(root(&doc), "Kills").as_deref(), Some("1,204"));
        assert_eq!(find_stat_value(root(&doc), "Deaths").as_deref(), Some("300"));
    }

    #[test]
    fn label_match_ignores_case_and_whitespace() {
        let doc = grid(
            r#"<div class="stat-ver"><span class="stat-name">
                 HS%
               </span><span class="stat-value">25%</span></div>"#,
        );
        assert_eq!(find_stat_value(root(&doc), "hs%").as_deref(), Some("25%"));
        assert_eq!(find_stat_value(root(&doc), " HS% ").as_deref(), Some("25%"));
    }

    #[test]
    fn missing_label_is_absent() {
        let doc = grid(
            r#"<div class="stat-ver"><span class="stat-name">Kills</span><span class="stat-value">5</span></div>"#,
        );
        assert!(find_stat_value(root(&doc), "Revives").is_none());
    }

    #[test]
    fn first_match_wins() {
        let doc = grid(
            r#"<div class="stat-ver"><span class="stat-name">Wins</span><span class="stat-value">7</span></div>
               <div class="stat-hor"><span class="stat-name">Wins</span><span class="stat-value">9</span></div>"#,
        );
        assert_eq!(find_stat_value(root(&doc), "Wins").as_deref(), Some("7"));
    }

    #[test]
    fn first_match_without_value_is_absent() {
        let doc = grid(
            r#"<div class="stat-ver"><span class="stat-name">Wins</span></div>
               <div class="stat-hor"><span class="stat-name">Wins</span><span class="stat-value">9</span></div>"#,
        );
        assert!(find_stat_value(root(&doc), "Wins").is_none());
    }

    #[test]
    fn collects_tokens_in_document_order() {
        let doc = grid(
            r#"<div class="stat-ver"><span class="stat-name">Kills</span><span class="stat-value">5</span></div>
               <div class="stat-hor"><span class="stat-name">Assists</span></div>
               <div class="stat-ver"><span class="stat-value">orphan</span></div>"#,
        );
        let tokens = stat_tokens(root(&doc));
        assert_eq!(
            tokens,
            vec![
                RawStatToken {
                    label: "Kills".into(),
                    value: "5".into()
                },
                RawStatToken {
                    label: "Assists".into(),
                    value: String::new()
                },
            ]
        );
    }
}
