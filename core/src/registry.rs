use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::error::ConfigError;

/// Which prompt template + tool schema a deployed process serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaVariant {
    FreeText,
    ScheduleExtraction,
    ModerationTagging,
}

impl SchemaVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaVariant::FreeText => "free_text",
            SchemaVariant::ScheduleExtraction => "schedule_extraction",
            SchemaVariant::ModerationTagging => "moderation_tagging",
        }
    }
}

impl fmt::Display for SchemaVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaVariant {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "free_text" => Ok(SchemaVariant::FreeText),
            "schedule_extraction" => Ok(SchemaVariant::ScheduleExtraction),
            "moderation_tagging" => Ok(SchemaVariant::ModerationTagging),
            other => Err(ConfigError::Invalid {
                var: "RELAY_VARIANT",
                reason: format!(
                    "unknown variant '{other}' (expected free_text, schedule_extraction or moderation_tagging)"
                ),
            }),
        }
    }
}

// The shape the model is told to fill in.
// `parameters` is a JSON Schema object; its `required` lists are authoritative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Risk tiers of the moderation taxonomy, in prompt order: general, high, medium, low.
pub const MODERATION_TIERS: [&str; 4] = ["通用", "高风险", "中风险", "低风险"];

/// Tag names and their descriptions, per tier. The prompt and the schema's
/// `enum` lists are both generated from this table.
pub const MODERATION_TAXONOMY: [(&str, &[(&str, &str)]); 4] = [
    (
        "通用",
        &[
            ("校园生活", "日常校园见闻、活动、宿舍与食堂等生活话题"),
            ("学习交流", "课程、考试、升学、科研等学习讨论或求助"),
            ("失物招领", "寻物启事或捡到物品的招领信息"),
            ("二手交易", "个人闲置物品的出售、求购或交换"),
            ("情感倾诉", "个人情绪、感情经历的分享与倾诉"),
        ],
    ),
    (
        "高风险",
        &[
            ("违法违规", "涉及违法犯罪、违禁品、代考作弊等内容"),
            ("色情低俗", "色情、性暗示或低俗露骨的内容"),
            ("暴力血腥", "暴力威胁、自残自杀、血腥恐怖的内容"),
            ("政治敏感", "涉及敏感政治话题或煽动性言论"),
            ("人身攻击", "辱骂、歧视、针对具体个人的攻击或网暴"),
        ],
    ),
    (
        "中风险",
        &[
            ("广告嫌疑", "商业推广、培训机构或代理服务的宣传，或明显为其招揽生意"),
            ("引流导流", "引导添加联系方式、加群或跳转站外平台"),
            ("诈骗嫌疑", "刷单、兼职返利、虚假中奖等疑似诈骗信息"),
            ("隐私泄露", "公开他人手机号、住址、证件等个人信息"),
        ],
    ),
    (
        "低风险",
        &[
            ("不文明用语", "轻度脏话、阴阳怪气等不文明表达"),
            ("灌水刷屏", "无意义重复内容或纯表情刷屏"),
            ("标题党", "标题夸张或与正文内容明显不符"),
            ("内容无关", "与校园论坛定位无关的内容"),
        ],
    ),
];

static SCHEDULE_TOOL: LazyLock<ToolSchema> = LazyLock::new(|| ToolSchema {
    name: "extract_schedule".to_string(),
    description: "记录从消息中提取出的直播日程列表".to_string(),
    parameters: json!({
        "type": "object",
        "properties": {
            "schedule_list": {
                "type": "array",
                "description": "按时间顺序排列的直播日程",
                "items": {
                    "type": "object",
                    "properties": {
                        "title": {
                            "type": "string",
                            "description": "原文标题，去除表情代码和链接地址"
                        },
                        "translated_title": {
                            "type": "string",
                            "description": "标题的简体中文翻译"
                        },
                        "timestamp": {
                            "type": "integer",
                            "description": "开播时间的 Unix 时间戳（秒）"
                        },
                        "notice": {
                            "type": "string",
                            "description": "该场直播的备注或补充说明"
                        }
                    },
                    "required": ["title", "translated_title", "timestamp"]
                }
            }
        },
        "required": ["schedule_list"]
    }),
});

static MODERATION_TOOL: LazyLock<ToolSchema> = LazyLock::new(|| {
    let mut properties = serde_json::Map::new();
    for (tier, tags) in MODERATION_TAXONOMY {
        let names: Vec<&str> = tags.iter().map(|(name, _)| *name).collect();
        properties.insert(
            tier.to_string(),
            json!({
                "type": "array",
                "description": format!("命中的「{tier}」类标签，没有则为空数组"),
                "items": { "type": "string", "enum": names }
            }),
        );
    }

    ToolSchema {
        name: "tag_content".to_string(),
        description: "按风险等级记录校园论坛投稿命中的审核标签".to_string(),
        parameters: json!({
            "type": "object",
            "properties": properties,
            "required": MODERATION_TIERS,
        }),
    }
});

pub struct Registry;

impl Registry {
    /// The single tool a variant offers the model, or `None` for free text.
    pub fn tool_for(variant: SchemaVariant) -> Option<&'static ToolSchema> {
        match variant {
            SchemaVariant::FreeText => None,
            SchemaVariant::ScheduleExtraction => Some(&*SCHEDULE_TOOL),
            SchemaVariant::ModerationTagging => Some(&*MODERATION_TOOL),
        }
    }
}
