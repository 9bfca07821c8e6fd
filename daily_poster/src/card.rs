use serde_json::{json, Value};

const DISCLAIMER: &str = "**以下描述由GEMINI生成（仅供参考），点击下方按钮查看详情。**";

/// Interactive card for the daily series post: header, image, disclaimer,
/// a button to the detail page, then the description.
pub fn series_card(series_name: &str, image_key: &str, link: &str, description: &str) -> Value {
    json!({
        "config": { "wide_screen_mode": true },
        "header": {
            "template": "green",
            "title": {
                "tag": "plain_text",
                "content": format!("每日车系介绍：{series_name}")
            }
        },
        "elements": [
            {
                "tag": "img",
                "img_key": image_key,
                "alt": { "tag": "plain_text", "content": format!("{series_name} 的图片") }
            },
            { "tag": "hr" },
            { "tag": "markdown", "content": DISCLAIMER },
            {
                "tag": "action",
                "actions": [{
                    "tag": "button",
                    "text": { "tag": "plain_text", "content": "查看车系详情" },
                    "url": link,
                    "type": "primary"
                }]
            },
            { "tag": "markdown", "content": description }
        ]
    })
}
