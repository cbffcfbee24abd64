//! Prompt assembly.
//!
//! Template text is static. Caller input is only ever appended into the one
//! designated slot at the end of a template, never interpreted.

use std::fmt::Write as _;
use std::sync::LazyLock;

use crate::registry::{SchemaVariant, MODERATION_TAXONOMY};

/// The system + user message pair sent for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system_message: Option<String>,
    pub user_message: String,
}

const SCHEDULE_SYSTEM: &str = "你是一名直播日程分析与翻译专家。";

const SCHEDULE_HEAD: &str = r#"下面是一段从 Discord 频道复制出来的直播日程公告，请从中提取每一场直播的信息并调用工具记录。

原文可能包含以下格式标记，请按规则处理：
1. 时间标记：形如 <t:1700000000> 或 <t:1700000000:F>，其中的数字就是开播时间的 Unix 时间戳（秒），直接填入 timestamp 字段，不要换算时区。
2. 超链接：形如 [链接文字](https://example.com)，只保留方括号中的链接文字，丢弃网址。
3. 表情代码：形如 <:name:123456> 或 <a:name:123456>，这是 Discord 自定义表情，输出中必须完全省略，不要出现在任何字段里。
4. 加粗文本：形如 **文字**，通常是该场直播的补充说明，去掉星号后填入 notice 字段。
5. 没有对应时间标记的内容不是一场直播，不要输出。

translated_title 字段填写标题的简体中文翻译，请参考以下译法：
- "Minecraft with friends!" → "和朋友们一起玩 Minecraft！"
- "【歌枠】Singing stream before bed" → "【歌回】睡前唱歌直播"
- "Zatsudan / Free talk" → "杂谈 / 自由聊天"
- "Collab w/ Mori" → "与 Mori 联动"
- "Dev stream" → "开发直播"
游戏名、人名等专有名词保持原文，不要音译。

公告原文如下：
"#;

const MODERATION_SYSTEM: &str = "你是一名校园论坛内容审核专家。";

const MODERATION_INTRO: &str = r#"请根据下面的审核标签体系，对一条校园论坛投稿进行分类，并调用工具记录结果。

投稿以 JSON 形式给出：list 数组中的每一项是一个内容片段，type 为 "text" 时 data 是文字内容，type 为 "image" 时 data 是图片地址（你无法查看图片，请结合上下文判断）。

标签体系共分四个风险等级，每个等级下的标签及含义如下：
"#;

const MODERATION_RULES: &str = r#"
分类规则：
1. 每个风险等级都必须输出，没有命中的等级输出空数组。
2. 只能使用上面列出的标签名，不要自创标签。
3. 一条投稿可以同时命中多个等级的多个标签。
4. 正常的校园内容至少在「通用」中给出一个标签。

投稿内容如下：
"#;

static MODERATION_HEAD: LazyLock<String> = LazyLock::new(|| {
    let mut head = String::from(MODERATION_INTRO);
    for (tier, tags) in MODERATION_TAXONOMY {
        let _ = writeln!(head, "\n【{tier}】");
        for (name, description) in tags {
            let _ = writeln!(head, "- {name}：{description}");
        }
    }
    head.push_str(MODERATION_RULES);
    head
});

pub struct PromptBuilder;

impl PromptBuilder {
    pub fn build(input: &str, variant: SchemaVariant) -> PromptPair {
        match variant {
            SchemaVariant::FreeText => PromptPair {
                system_message: None,
                user_message: input.to_string(),
            },
            SchemaVariant::ScheduleExtraction => PromptPair {
                system_message: Some(SCHEDULE_SYSTEM.to_string()),
                user_message: splice(SCHEDULE_HEAD, input),
            },
            SchemaVariant::ModerationTagging => PromptPair {
                system_message: Some(MODERATION_SYSTEM.to_string()),
                user_message: splice(&MODERATION_HEAD, input),
            },
        }
    }
}

fn splice(head: &str, input: &str) -> String {
    let mut out = String::with_capacity(head.len() + input.len());
    out.push_str(head);
    out.push_str(input);
    out
}
