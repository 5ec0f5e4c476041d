//! Prompt templates for the model.

use crate::event::EventRequest;

fn or_unspecified(value: &str) -> &str {
    if value.trim().is_empty() {
        "Не указано"
    } else {
        value
    }
}

fn money(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.0} рублей", v),
        None => "не указан".to_string(),
    }
}

/// Prompt asking for a JSON budget breakdown.
pub fn budget_prompt(event: &EventRequest) -> String {
    format!(
        r#"Ты - эксперт по финансовому планированию мероприятий. Рассчитай детальную смету события.

ИНФОРМАЦИЯ О СОБЫТИИ:
- Название: {name}
- Тип события: {kind}
- Дата: {date}
- Место проведения: {location}
- Ожидаемое количество гостей: {guests}
- Лимит бюджета: {limit}

ЗАДАЧА:
1. Создай детальную смету по категориям
2. Рассчитай реалистичные суммы для каждой статьи расходов
3. Убедись, что итоговая сумма не превышает лимит бюджета
4. Дай рекомендации по оптимизации бюджета

ОСНОВНЫЕ КАТЕГОРИИ:
- Аренда площадки
- Кейтеринг (питание)
- Техническое обеспечение (звук, свет, проекторы)
- Декорации и оформление
- Фото/видео съемка
- Маркетинг и реклама
- Подарки и сувениры
- Персонал и координаторы
- Транспорт (если необходимо)
- Резерв (10% от общего бюджета)

ФОРМАТ ОТВЕТА (JSON):
{{
  "items": [
    {{
      "category": "Аренда площадки",
      "planned_amount": 350000,
      "description": "Конференц-зал на 500 человек, 8 часов"
    }}
  ],
  "total_amount": 1500000,
  "analysis": "Краткий анализ бюджета",
  "recommendations": [
    "Рекомендация по оптимизации 1",
    "Рекомендация по оптимизации 2"
  ]
}}

Рассчитай реалистичную смету на русском языке. Верни ТОЛЬКО JSON без дополнительного текста.
"#,
        name = event.event_name,
        kind = or_unspecified(&event.event_type),
        date = or_unspecified(&event.event_date),
        location = or_unspecified(&event.location),
        guests = event.expected_guests,
        limit = money(event.ceiling()),
    )
}

/// Prompt asking for a JSON event plan.
pub fn planning_prompt(event: &EventRequest) -> String {
    format!(
        r#"Ты - эксперт по планированию мероприятий. Создай детальный план события.

ИНФОРМАЦИЯ О СОБЫТИИ:
- Название: {name}
- Тип события: {kind}
- Дата: {date}
- Место проведения: {location}
- Ожидаемое количество гостей: {guests}
- Бюджет: {budget}
- Целевая аудитория: {audience}
- Формат: {format}

ЗАДАЧА:
1. Создай детальный таймлайн мероприятия с указанием времени
2. Раздели на основные фазы (регистрация, основная программа, перерывы, закрытие)
3. Создай список конкретных задач для подготовки
4. Укажи приоритеты задач
5. Определи критический путь подготовки

ФОРМАТ ОТВЕТА (JSON):
{{
  "timeline_phases": [
    {{
      "time": "09:00 - 10:00",
      "activity": "Регистрация участников",
      "description": "Приветственный кофе, выдача бейджей"
    }}
  ],
  "tasks": [
    {{
      "title": "Забронировать площадку",
      "priority": "HIGH",
      "deadline_days": 60,
      "description": "Забронировать конференц-зал"
    }}
  ],
  "critical_path": ["Площадка", "Программа", "Кейтеринг"],
  "recommendations": [
    "Рекомендация 1",
    "Рекомендация 2"
  ]
}}

Создай реалистичный и детальный план на русском языке. Верни ТОЛЬКО JSON без дополнительного текста.
"#,
        name = event.event_name,
        kind = or_unspecified(&event.event_type),
        date = or_unspecified(&event.event_date),
        location = or_unspecified(&event.location),
        guests = event.expected_guests,
        budget = money(event.budget.or(event.budget_limit)),
        audience = or_unspecified(event.target_audience.as_deref().unwrap_or("")),
        format = or_unspecified(&event.format),
    )
}

/// Prompt asking for a single intent label.
pub fn intent_prompt(message: &str) -> String {
    format!(
        r#"Классифицируй намерение пользователя в следующем сообщении.

Сообщение: "{message}"

Возможные намерения:
- create_event_plan: пользователь хочет создать план события
- calculate_budget: пользователь хочет рассчитать смету/бюджет
- full_event_planning: пользователь хочет и план, и смету
- unknown: не удается определить намерение

Верни ТОЛЬКО одно слово - название намерения, без дополнительного текста.
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> EventRequest {
        let mut event = EventRequest::new("TechSummit 2025");
        event.event_type = "conference".to_string();
        event.expected_guests = 500;
        event.budget_limit = Some(1_500_000.0);
        event
    }

    #[test]
    fn test_budget_prompt_fills_event() {
        let prompt = budget_prompt(&event());
        assert!(prompt.contains("- Название: TechSummit 2025"));
        assert!(prompt.contains("- Ожидаемое количество гостей: 500"));
        assert!(prompt.contains("- Лимит бюджета: 1500000 рублей"));
        assert!(prompt.contains("- Место проведения: Не указано"));
        // Literal braces survive formatting.
        assert!(prompt.contains("\"items\": ["));
        assert!(prompt.contains("{\n      \"category\""));
    }

    #[test]
    fn test_budget_prompt_without_ceiling() {
        let mut event = event();
        event.budget_limit = None;
        assert!(budget_prompt(&event).contains("- Лимит бюджета: не указан"));
    }

    #[test]
    fn test_planning_prompt_uses_budget_then_limit() {
        let prompt = planning_prompt(&event());
        assert!(prompt.contains("- Бюджет: 1500000 рублей"));
        assert!(prompt.contains("- Целевая аудитория: Не указано"));

        let mut event = event();
        event.budget = Some(900_000.0);
        event.target_audience = Some("IT-специалисты".to_string());
        let prompt = planning_prompt(&event);
        assert!(prompt.contains("- Бюджет: 900000 рублей"));
        assert!(prompt.contains("- Целевая аудитория: IT-специалисты"));
    }

    #[test]
    fn test_intent_prompt_quotes_message() {
        assert!(intent_prompt("Нужна смета").contains("Сообщение: \"Нужна смета\""));
    }
}
