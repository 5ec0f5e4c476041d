//! Model-free budget estimate.
//!
//! Seven categories take a fixed share of the ceiling, two scale with the
//! guest count. The per-guest terms are independent of the ceiling, so the
//! total can overshoot it; that is accepted and not reconciled.

use super::{BudgetResult, BudgetStatus, LineItem};

/// Catering cost per guest.
pub const CATERING_PER_GUEST: f64 = 2500.0;

/// Gifts and souvenirs cost per guest.
pub const GIFTS_PER_GUEST: f64 = 500.0;

const VENUE_SHARE: f64 = 0.25;
const TECH_SHARE: f64 = 0.15;
const DECORATION_SHARE: f64 = 0.10;
const PHOTO_SHARE: f64 = 0.10;
const MARKETING_SHARE: f64 = 0.12;
const STAFF_SHARE: f64 = 0.08;
const RESERVE_SHARE: f64 = 0.10;

/// Build the fallback budget for `guests` people under `ceiling`.
pub fn fallback_budget(guests: u32, ceiling: f64) -> BudgetResult {
    let guests_f = f64::from(guests);

    let items = vec![
        LineItem::new("Аренда площадки", ceiling * VENUE_SHARE, "Конференц-зал"),
        LineItem::new(
            "Кейтеринг",
            guests_f * CATERING_PER_GUEST,
            format!("Питание для {} человек", guests),
        ),
        LineItem::new(
            "Техническое обеспечение",
            ceiling * TECH_SHARE,
            "Звук, свет, проекторы",
        ),
        LineItem::new(
            "Декорации и оформление",
            ceiling * DECORATION_SHARE,
            "Оформление зала",
        ),
        LineItem::new(
            "Фото/видео съемка",
            ceiling * PHOTO_SHARE,
            "Фотограф и видеооператор",
        ),
        LineItem::new(
            "Маркетинг и реклама",
            ceiling * MARKETING_SHARE,
            "Реклама и продвижение",
        ),
        LineItem::new(
            "Подарки и сувениры",
            guests_f * GIFTS_PER_GUEST,
            format!("Сувениры для {} человек", guests),
        ),
        LineItem::new(
            "Персонал и координаторы",
            ceiling * STAFF_SHARE,
            "Координаторы и хостес",
        ),
        LineItem::new("Резерв", ceiling * RESERVE_SHARE, "Резервный фонд"),
    ];

    let mut recommendations = vec![
        "Рассмотрите возможность сокращения бюджета на декорации".to_string(),
        "Договоритесь с подрядчиками заранее для получения скидок".to_string(),
    ];

    let mut result = BudgetResult::from_items(
        items,
        "Базовый расчет сметы на основе стандартных коэффициентов",
        Vec::new(),
    );
    if result.total_amount > ceiling {
        recommendations.push(format!(
            "Базовая смета превышает лимит на {:.2} руб. из-за расходов на гостей; \
             уточните количество гостей или лимит",
            result.total_amount - ceiling
        ));
    }
    result.recommendations = recommendations;
    result.status = Some(BudgetStatus::WithinBudget);
    result
}
