// SPDX-FileCopyrightText: 2026 Lexrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rule-based intent classifier and startup classifier selection.
//!
//! The rule tables are checked in order; the first intent with any keyword
//! hit wins with a fixed 0.8 confidence. No hit falls through to
//! [`Intent::Other`] at 0.5, which sits below the default confidence
//! threshold and therefore routes to generic knowledge search.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use lexrelay_config::model::QaConfig;
use lexrelay_core::error::RelayError;
use lexrelay_core::traits::IntentClassifier;
use lexrelay_core::types::{Classification, Intent};

use crate::onnx::OnnxClassifier;

/// Confidence assigned to a keyword-rule match.
const RULE_MATCH_CONFIDENCE: f32 = 0.8;
/// Confidence assigned to the fallthrough label.
const RULE_DEFAULT_CONFIDENCE: f32 = 0.5;

/// Keyword tables, checked in order. `Inquiry` sits after the legal
/// categories so "咨询合同问题" classifies as a contract consultation, not
/// a generic inquiry.
const INTENT_RULES: &[(Intent, &[&str])] = &[
    (Intent::ContractConsultation, &["合同", "协议", "条款", "签约", "违约"]),
    (Intent::LaborDispute, &["工资", "加班", "辞职", "解雇", "劳动合同"]),
    (Intent::CivilLitigation, &["起诉", "诉讼", "法院", "判决书", "打官司"]),
    (Intent::CriminalDefense, &["犯罪", "刑法", "辩护", "拘留", "逮捕"]),
    (Intent::PropertyRights, &["房产", "财产", "继承", "赠与", "产权"]),
    (Intent::MarriageFamily, &["离婚", "结婚", "财产分割", "子女抚养", "家庭纠纷"]),
    (Intent::IntellectualProperty, &["专利", "商标", "版权", "知识产权", "侵权"]),
    (Intent::AdministrativeLaw, &["行政", "政府", "许可", "处罚", "行政诉讼"]),
    (Intent::CompanyLaw, &["公司", "股权", "股东", "破产", "并购"]),
    (Intent::Greeting, &["你好", "您好", "hi", "hello", "早上好", "下午好"]),
    (Intent::Thanks, &["谢谢", "感谢", "感激", "多谢"]),
    (Intent::Inquiry, &["请问", "想知道", "咨询", "了解", "如何"]),
    (Intent::Complaint, &["投诉", "不满", "问题", "错误", "失误"]),
];

/// Keyword-rule classifier. Always available; used when no ONNX model is
/// configured or the model fails to load.
pub struct RuleClassifier;

impl RuleClassifier {
    pub fn classify_text(text: &str) -> Classification {
        let text = text.to_lowercase();
        for (intent, keywords) in INTENT_RULES {
            if keywords.iter().any(|k| text.contains(k)) {
                return Classification {
                    intent: *intent,
                    confidence: RULE_MATCH_CONFIDENCE,
                };
            }
        }
        Classification {
            intent: Intent::Other,
            confidence: RULE_DEFAULT_CONFIDENCE,
        }
    }
}

#[async_trait]
impl IntentClassifier for RuleClassifier {
    async fn classify(&self, text: &str) -> Result<Classification, RelayError> {
        Ok(Self::classify_text(text))
    }

    fn name(&self) -> &'static str {
        "rules"
    }
}

/// Picks the classifier at startup: the ONNX model when configured and
/// loadable, the rule tables otherwise.
pub fn select_classifier(config: &QaConfig) -> Arc<dyn IntentClassifier> {
    if let Some(dir) = &config.intent_model_dir {
        match OnnxClassifier::load(Path::new(dir)) {
            Ok(model) => {
                info!(model_dir = %dir, "intent classifier: onnx");
                return Arc::new(model);
            }
            Err(e) => {
                warn!(model_dir = %dir, error = %e, "intent model load failed, using rules");
            }
        }
    } else {
        info!("intent classifier: rules (no model configured)");
    }
    Arc::new(RuleClassifier)
}
