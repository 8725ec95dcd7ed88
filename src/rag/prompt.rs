use super::ranker::RankedHit;
use crate::llm::ChatMessage;

/// Renders the hits as numbered context blocks, in rank order.
pub fn render_context(hits: &[RankedHit<'_>]) -> String {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| {
            let meta = &hit.record.metadata;
            let industry = if meta.industry.is_empty() {
                String::new()
            } else {
                format!(" | 산업군:{}", meta.industry)
            };
            format!(
                "[{}] {} | {} | {}{}\n{}",
                i + 1,
                meta.title,
                meta.date,
                meta.venue,
                industry,
                hit.record.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn user_turn(question: &str, hits: &[RankedHit<'_>]) -> String {
    format!(
        "질문: {}\n\n[참고 가능한 이벤트]\n{}\n\n위 정보만 사용해 사용자 질문에 답하세요.",
        question,
        render_context(hits)
    )
}

/// System instruction, prior turns, then the synthesized user turn.
pub fn assemble(
    system_prompt: &str,
    history: &[ChatMessage],
    question: &str,
    hits: &[RankedHit<'_>],
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(system_prompt));
    messages.extend_from_slice(history);
    messages.push(ChatMessage::user(user_turn(question, hits)));
    messages
}
