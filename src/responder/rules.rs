//! Keyword rules, checked top to bottom

use crate::config::{WorkflowDefinition, WorkflowKind};

/// Workflow attached to a canned reply
#[derive(Debug, Clone, Copy)]
pub struct WorkflowStub {
    pub name: &'static str,
    pub kind: WorkflowKind,
    pub api_endpoint: &'static str,
    pub estimated_time: &'static str,
}

impl WorkflowStub {
    pub fn to_definition(&self) -> WorkflowDefinition {
        WorkflowDefinition::stub(self.name, self.kind, self.api_endpoint, self.estimated_time)
    }
}

/// A canned reply triggered by any of its keywords
#[derive(Debug, Clone, Copy)]
pub struct ResponseRule {
    pub topic: &'static str,
    /// Lowercase substrings; any one triggers the rule
    pub keywords: &'static [&'static str],
    pub message: &'static str,
    pub workflow: WorkflowStub,
}

impl ResponseRule {
    /// `input` must already be lowercased
    pub fn matches(&self, input: &str) -> bool {
        self.keywords.iter().any(|k| input.contains(k))
    }
}

/// Order is significant: the first matching rule wins.
pub static RULES: [ResponseRule; 5] = [
    ResponseRule {
        topic: "training",
        keywords: &["custom model", "train", "brand model"],
        message: "I'll help you set up Custom Model training for your brand! For optimal results, I recommend curating 100-150 diverse brand images that represent your visual style, including various lighting conditions, product angles, and brand colors.\n\nWould you like me to guide you through the asset curation process, or do you have your training dataset ready?",
        workflow: WorkflowStub {
            name: "Custom Model Training",
            kind: WorkflowKind::Training,
            api_endpoint: "/v1/models/train",
            estimated_time: "45-90 minutes",
        },
    },
    ResponseRule {
        topic: "generation",
        keywords: &["generate", "campaign", "variations"],
        message: "Perfect! I'll set up automated campaign asset generation using your Custom Model. This workflow will create multiple variations while maintaining brand consistency.\n\nI can generate assets for different platforms, aspect ratios, and messaging variations. How many assets do you need, and for which channels?",
        workflow: WorkflowStub {
            name: "Campaign Asset Generation",
            kind: WorkflowKind::Generation,
            api_endpoint: "/v2/images/generate",
            estimated_time: "8-15 seconds per asset",
        },
    },
    ResponseRule {
        topic: "photoshop",
        keywords: &["photoshop", "generative fill", "background"],
        message: "I'll walk you through Photoshop + Firefly integration! Generative Fill works best when you clearly define the area to modify and use specific, descriptive prompts.\n\nFor background replacement, I recommend using Photoshop's Background Removal API first, then applying Firefly-generated backgrounds with Generative Fill for seamless integration.",
        workflow: WorkflowStub {
            name: "Photoshop Integration",
            kind: WorkflowKind::Processing,
            api_endpoint: "/photoshop/generateFill",
            estimated_time: "15-30 seconds per image",
        },
    },
    ResponseRule {
        topic: "localization",
        keywords: &["localize", "international", "markets"],
        message: "I'll help you localize your campaign for international markets! This involves using region-specific Custom Models for cultural authenticity, translating text elements, and adapting visual elements for local preferences.\n\nWhich markets are you targeting? I can recommend the best approach for each region and set up automated localization workflows.",
        workflow: WorkflowStub {
            name: "Campaign Localization",
            kind: WorkflowKind::Optimization,
            api_endpoint: "/v1/localization/batch",
            estimated_time: "3-5 minutes per market",
        },
    },
    ResponseRule {
        topic: "channels",
        keywords: &["platform", "channel", "resize", "social"],
        message: "I'll optimize your creative for multiple platforms automatically! Using Firefly Creative Production, I can resize, crop intelligently, and use Generative Expand for larger formats while maintaining your focal points.\n\nI'll create versions for Instagram (1:1, 4:5, 9:16), Facebook (1.91:1, 4:5), Twitter (16:9, 2:1), LinkedIn (1.91:1), and TikTok (9:16). This typically takes 2-4 minutes for all variations.",
        workflow: WorkflowStub {
            name: "Multi-Channel Optimization",
            kind: WorkflowKind::Optimization,
            api_endpoint: "/v1/production/batch",
            estimated_time: "2-4 minutes",
        },
    },
];

/// First rule matching `input` (already lowercased)
pub fn first_match(input: &str) -> Option<&'static ResponseRule> {
    RULES.iter().find(|rule| rule.matches(input))
}
