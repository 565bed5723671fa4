//! Text rendering for post cards, list pages and moderation views.
//!
//! Output uses the platform's HTML subset. User-supplied single-line fields
//! are escaped; the body is passed through because submission validation
//! already restricted it to the allowed tags.

use chrono::FixedOffset;
use eventcast_core::pagination::Section;
use eventcast_core::submission::format_local_event_time;
use eventcast_db::models::post::PostCard;

pub const NOT_FOUND_TEXT: &str = "Это мероприятие больше недоступно 🙈";

/// Footer under every list page.
const LIST_FOOTER: &str = "<b>Подробнее о мероприятии – нажмите на число ниже</b>";

const UNSPECIFIED: &str = "Не указан";

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn joined(items: &[String]) -> String {
    if items.is_empty() {
        UNSPECIFIED.to_string()
    } else {
        escape_html(&items.join(", "))
    }
}

fn event_time(card: &PostCard, offset: FixedOffset) -> Option<String> {
    card.post
        .event_at
        .map(|at| format_local_event_time(at, offset))
}

fn location(card: &PostCard) -> String {
    match card.post.address.as_deref() {
        Some(address) => format!("{}, {}", joined(&card.city_names), escape_html(address)),
        None => joined(&card.city_names),
    }
}

/// Detail card shown when a post is opened from a list, and as the body of
/// subscriber notifications.
pub fn post_card_text(card: &PostCard, offset: FixedOffset) -> String {
    let mut lines = vec![
        format!("⭐️ <i>{}</i>", joined(&card.category_labels)),
        String::new(),
        format!("<b>{}</b>", escape_html(&card.post.title)),
    ];
    if let Some(at) = event_time(card, offset) {
        lines.push(format!("<i>🗓 {at}</i>"));
    }
    lines.push(format!("<i>📍 {}</i>", location(card)));
    lines.push(String::new());
    lines.push(card.post.body.clone());
    lines.join("\n")
}

/// Card shown to moderators for a pending post.
pub fn moderation_card_text(card: &PostCard, author_name: &str, offset: FixedOffset) -> String {
    let mut lines = vec![
        "<b>Пост на модерацию</b>".to_string(),
        String::new(),
        format!("<b>{}</b>", escape_html(&card.post.title)),
        format!("<i>⭐️ {}</i>", joined(&card.category_labels)),
        format!(
            "<i>🗓 {}</i>",
            event_time(card, offset).unwrap_or_else(|| "Не указано".to_string())
        ),
        String::new(),
        format!("📍 <b>Город:</b> {}", joined(&card.city_names)),
        format!(
            "📌 <b>Адрес:</b> {}",
            card.post
                .address
                .as_deref()
                .map(escape_html)
                .unwrap_or_else(|| UNSPECIFIED.to_string())
        ),
        format!("👤 <b>Автор:</b> {}", escape_html(author_name)),
    ];
    if let Some(link) = &card.post.link {
        lines.push(format!("🔗 {}", escape_html(link)));
    }
    lines.push(String::new());
    lines.push(format!("<i>{}</i>", card.post.body));
    lines.join("\n")
}

fn list_heading(section: Section) -> &'static str {
    match section {
        Section::Feed => "Подборка актуальных мероприятий",
        Section::Favorites => "Избранные мероприятия",
        Section::Moderation => "Мероприятия на модерации",
    }
}

/// Text shown when a section has nothing to list.
pub fn empty_list_text(section: Section) -> &'static str {
    match section {
        Section::Feed => {
            "Пока нет актуальных мероприятий в ваших городах и категориях 😔\n\
             Попробуйте выбрать больше категорий или загляните позже."
        }
        Section::Favorites => "В избранном пока пусто. Нажмите 🤍 под мероприятием, чтобы сохранить его.",
        Section::Moderation => "Очередь модерации пуста ✨",
    }
}

/// Numbered summary of one list page. `start_index` is the 1-based ordinal
/// of the first card.
pub fn list_text(
    section: Section,
    cards: &[PostCard],
    start_index: usize,
    offset: FixedOffset,
) -> String {
    let mut lines = vec![list_heading(section).to_string(), String::new()];
    for (i, card) in cards.iter().enumerate() {
        lines.push(format!("{}. <b>{}</b>", start_index + i, escape_html(&card.post.title)));
        lines.push(format!("<i>   ⭐️ {}</i>", joined(&card.category_labels)));
        if let Some(at) = event_time(card, offset) {
            lines.push(format!("<i>   🗓 {at}</i>"));
        }
        if section == Section::Favorites {
            lines.push(format!("<i>   📍 {}</i>", joined(&card.city_names)));
        }
        lines.push(String::new());
    }
    lines.push(LIST_FOOTER.to_string());
    lines.join("\n")
}
