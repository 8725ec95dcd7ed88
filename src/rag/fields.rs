//! Maps heterogeneous spreadsheet rows onto [`EventMetadata`].
//!
//! Column names vary between sheets, so every canonical field carries a list
//! of accepted labels. A label matches exactly first; failing that, any header
//! whose whitespace-stripped form contains a whitespace-stripped label wins,
//! scanning headers in row order.

use super::record::EventMetadata;
use crate::sources::SourceRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Category,
    Industry,
    Title,
    Subtitle,
    StartDate,
    EndDate,
    Venue,
    Price,
    Host,
    Manage,
    Inquiry,
    Site,
    Ticket,
    Age,
    Gender,
    Interest,
    Job,
}

pub const FIELD_ALIASES: &[(Field, &[&str])] = &[
    (Field::Category, &["행사분류", "행사구분"]),
    (
        Field::Industry,
        &["행사분야", "산업군", "산업분야", "카테고리", "분야", "industry", "Category"],
    ),
    (Field::Title, &["행사명"]),
    (Field::Subtitle, &["행사명(서브타이틀)"]),
    (
        Field::StartDate,
        &["행사 시작일자", "날짜", "기간", "개최기간", "전시기간", "date"],
    ),
    (Field::EndDate, &["행사 종료일자"]),
    (
        Field::Venue,
        &["행사 장소", "장소", "전시장", "개최장소", "Hall", "venue"],
    ),
    (Field::Price, &["입장료"]),
    (Field::Host, &["주최"]),
    (Field::Manage, &["주관"]),
    (
        Field::Inquiry,
        &["담당자/공연문의 정보", "단체문의 정보", "예매문의 정보"],
    ),
    (Field::Site, &["관련 사이트"]),
    (Field::Ticket, &["티켓 예약"]),
    (Field::Age, &["추천 연령대", "연령대", "나이"]),
    (Field::Gender, &["성별"]),
    (Field::Interest, &["관심사"]),
    (Field::Job, &["직업"]),
];

pub fn aliases(field: Field) -> &'static [&'static str] {
    FIELD_ALIASES
        .iter()
        .find(|(candidate, _)| *candidate == field)
        .map(|(_, labels)| *labels)
        .unwrap_or(&[])
}

fn strip_whitespace(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect()
}

/// First non-blank trimmed value under one of `labels`, or an empty string.
pub fn pick_by_aliases(row: &SourceRow, labels: &[&str]) -> String {
    for label in labels {
        if let Some(value) = row.get(label).map(str::trim).filter(|v| !v.is_empty()) {
            return value.to_string();
        }
    }

    let stripped: Vec<String> = labels.iter().map(|l| strip_whitespace(l)).collect();
    for (key, value) in row.iter() {
        let normalized = strip_whitespace(key);
        if !stripped.iter().any(|label| normalized.contains(label.as_str())) {
            continue;
        }
        let value = value.trim();
        if !value.is_empty() {
            return value.to_string();
        }
    }

    String::new()
}

pub fn map_row(row: &SourceRow) -> EventMetadata {
    let pick = |field| pick_by_aliases(row, aliases(field));

    let start = pick(Field::StartDate);
    let end = pick(Field::EndDate);
    let date = if !start.is_empty() && !end.is_empty() && start != end {
        format!("{} ~ {}", start, end)
    } else {
        start
    };

    let mut meta = EventMetadata {
        category: pick(Field::Category),
        industry: pick(Field::Industry),
        title: pick(Field::Title),
        subtitle: pick(Field::Subtitle),
        date,
        venue: pick(Field::Venue),
        price: pick(Field::Price),
        host: pick(Field::Host),
        manage: pick(Field::Manage),
        inquiry: pick(Field::Inquiry),
        site: pick(Field::Site),
        ticket: pick(Field::Ticket),
        age: pick(Field::Age),
        gender: pick(Field::Gender),
        interest: pick(Field::Interest),
        job: pick(Field::Job),
        base_text: String::new(),
    };
    meta.base_text = base_text(&meta);
    meta
}

fn base_text(meta: &EventMetadata) -> String {
    let full_title = if meta.subtitle.is_empty() {
        meta.title.clone()
    } else {
        format!("{} ({})", meta.title, meta.subtitle)
    };

    let labelled = [
        ("분류/구분", &meta.category),
        ("행사분야", &meta.industry),
        ("기간", &meta.date),
        ("장소", &meta.venue),
        ("입장료", &meta.price),
        ("추천연령", &meta.age),
        ("성별", &meta.gender),
        ("관심사", &meta.interest),
        ("직업", &meta.job),
        ("주최", &meta.host),
        ("주관", &meta.manage),
        ("문의", &meta.inquiry),
        ("웹사이트", &meta.site),
        ("티켓 예약", &meta.ticket),
    ];

    std::iter::once(full_title)
        .chain(
            labelled
                .iter()
                .filter(|(_, value)| !value.is_empty())
                .map(|(label, value)| format!("{}:{}", label, value)),
        )
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" / ")
}
