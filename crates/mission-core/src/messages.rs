//! User-facing text sent by the service

/// No session exists for the user
pub const NO_ACTIVE_MISSION: &str = "目前沒有進行中的任務，請先從選單選擇任務";
/// Mission is not in the catalog or no longer active
pub const UNKNOWN_MISSION: &str = "找不到這個任務，請重新選擇";
/// Submit was requested too early
pub const NOT_READY: &str = "內容還沒有完成，請依照提示繼續上傳";
/// Action on a prompt without a live handler
pub const EXPIRED_PROMPT: &str = "這個選項已經過期，請重新開始任務";
/// Backend write failed; the content is kept
pub const SUBMISSION_FAILED: &str = "送出失敗，請稍後再按一次送出";
/// Storage or other internal failure
pub const INTERNAL_ERROR: &str = "系統忙碌中，請稍後再試";
/// Mission submitted
pub const SUBMITTED: &str = "已收到你的內容，正在為你製作，完成後會通知你";
/// User chose to keep editing
pub const KEEP_EDITING: &str = "好的，你可以繼續修改內容";
/// Extraction gave up
pub const AI_APOLOGY: &str = "抱歉，我沒有看懂你的回答，可以換個方式再說一次嗎？";

/// Prompt states shown by editing the prompt in place
pub const PROMPT_HANDLED: &str = "已收到你的選擇";
/// Prompt of a submitted mission
pub const PROMPT_SUBMITTED: &str = "已送出";
/// Prompt displaced, expired or undecodable
pub const PROMPT_CLOSED: &str = "這個選項已失效";

/// Action labels
pub const LABEL_START: &str = "開始";
/// Confirm button
pub const LABEL_SUBMIT: &str = "確認送出";
/// Keep-editing button
pub const LABEL_EDIT: &str = "繼續修改";
/// Prefix of replacement picker options
pub const LABEL_REPLACE: &str = "替換";

/// Mission introduction
#[must_use]
pub fn mission_intro(name: &str) -> String {
    format!("任務「{name}」開始囉！")
}

/// Multi-item submission stopped at `item` (zero-based)
#[must_use]
pub fn partial_submission(item: usize, total: usize) -> String {
    format!("第 {} 項（共 {total} 項）送出失敗，之前的項目已保存，請再按一次送出從第 {} 項繼續", item + 1, item + 1)
}

/// Replacement picker prompt
#[must_use]
pub fn pick_replacement(count: usize) -> String {
    format!("請選擇要替換的項目（1 - {count}），接著上傳新的檔案")
}

/// Awaiting the replacement upload
#[must_use]
pub fn upload_replacement(target: usize) -> String {
    format!("請上傳要替換第 {target} 項的新檔案")
}

/// Quiz answer acknowledgement
#[must_use]
pub fn quiz_answered(correct: bool) -> &'static str {
    if correct {
        "答對了！"
    } else {
        "收到你的回答了"
    }
}

/// Quiz answer for a question the mission does not have (zero-based)
#[must_use]
pub fn unknown_question(question: usize, total: usize) -> String {
    format!("找不到第 {} 題（共 {total} 題），請重新開始問卷", question + 1)
}

/// Book cover chosen
pub const COVER_SAVED: &str = "封面已設定";

/// Text arrived before any media to caption
#[must_use]
pub fn media_first(label: &str) -> String {
    format!("請先上傳{label}，再寫下說明")
}

/// Confirmation summary
#[must_use]
pub fn confirm_summary(attachments: usize, answers: usize) -> String {
    format!("內容都收到了：{attachments} 個檔案、{answers} 則文字。確認無誤就按「{LABEL_SUBMIT}」")
}

/// Cover picker prompt
pub const PICK_COVER: &str = "請選擇一張照片作為封面";

/// Label of a cover option (zero-based index)
#[must_use]
pub fn cover_option(index: usize) -> String {
    format!("第 {} 張", index + 1)
}
