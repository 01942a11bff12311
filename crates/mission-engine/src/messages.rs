//! User-facing text

use mission_types::{ContentKind, MissionFlow, Step};

/// Counting unit for a kind
#[must_use]
pub fn unit(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Photo => "張",
        ContentKind::Video | ContentKind::Audio => "段",
        ContentKind::Answer => "題",
    }
}

/// Prompt for the next expected input
#[must_use]
pub fn step_prompt(flow: MissionFlow, media: Option<ContentKind>, step: Step) -> String {
    match step {
        Step::AwaitPhoto(i) | Step::AwaitVideo(i) | Step::AwaitAudio(i) => {
            let kind = step.kind().unwrap_or_default();
            format!("請上傳第 {} {}{}", i + 1, unit(kind), kind.label())
        }
        Step::AwaitAnswer(i) => match (flow, media) {
            (MissionFlow::Questionnaire, _) | (_, None) => format!("請回答第 {} 題", i + 1),
            (_, Some(kind)) => format!(
                "請為第 {} {}{}寫下一句話",
                i + 1,
                unit(kind),
                kind.label()
            ),
        },
        Step::AwaitConfirmation => "內容都收到了，請確認後送出".to_string(),
        Step::Ready => "內容已完成，正在為你製作".to_string(),
    }
}

/// Capacity overflow rejection
#[must_use]
pub fn capacity_exceeded(kind: ContentKind, required: usize, current: usize, incoming: usize) -> String {
    let unit = unit(kind);
    format!(
        "已達到上限 {required} {unit}{label}，目前已有 {current} {unit}，這次上傳了 {incoming} {unit}，請挑選後再上傳",
        label = kind.label()
    )
}

/// Upload of a kind the mission does not collect
#[must_use]
pub fn kind_not_needed(kind: ContentKind) -> String {
    format!("這個任務不需要{}", kind.label())
}

/// Empty upload batch
pub const EMPTY_BATCH: &str = "沒有收到檔案，請再試一次";

/// Letter over the character cap
#[must_use]
pub fn letter_too_long(max: usize, actual: usize) -> String {
    format!("信件內容上限 {max} 字，目前 {actual} 字，請刪減後再傳一次")
}

/// General answer over the visual-line cap
#[must_use]
pub fn too_many_lines(max: usize) -> String {
    format!("請精簡在 {max} 行以內，再傳一次")
}

/// Blank text
pub const EMPTY_TEXT: &str = "沒有收到文字內容，請再傳一次";

/// Mission takes no text
pub const TEXT_NOT_NEEDED: &str = "這個任務不需要文字";

/// Replacement target outside the existing slots
#[must_use]
pub fn replacement_out_of_range(target: usize, count: usize) -> String {
    format!("無法替換第 {target} 項，目前只有 {count} 項內容")
}

/// Replacement done
#[must_use]
pub fn replaced(kind: ContentKind, slot: usize) -> String {
    format!("已替換第 {} {}{}", slot + 1, unit(kind), kind.label())
}
