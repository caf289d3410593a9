use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::GenerateError;

/// The fixed set of generation intents the gateway accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptType {
    Listing,
    Blog,
    SocialAds,
    NewsDiscovery,
    NewsRewrite,
    ImagePrompt,
}

impl PromptType {
    pub fn parse(s: &str) -> Result<Self, GenerateError> {
        match s {
            "listing" => Ok(Self::Listing),
            "blog" => Ok(Self::Blog),
            "social_ads" => Ok(Self::SocialAds),
            "news_discovery" => Ok(Self::NewsDiscovery),
            "news_rewrite" => Ok(Self::NewsRewrite),
            "image_prompt" => Ok(Self::ImagePrompt),
            other => Err(GenerateError::InvalidPromptType(other.to_string())),
        }
    }

    /// Text-oriented intents get markdown stripped into copy-paste-ready
    /// plain text; the rest return the model's raw output.
    pub fn wants_plain_text(self) -> bool {
        matches!(self, Self::Listing | Self::Blog | Self::NewsRewrite)
    }

    pub fn system_prompt(self) -> &'static str {
        match self {
            Self::Listing => {
                "You are an experienced real-estate copywriter. Write compelling, \
                 truthful property listing descriptions that highlight what makes \
                 a property attractive without exaggerating. Keep the tone warm \
                 and professional."
            }
            Self::Blog => {
                "You are a content writer for a real-estate agency blog. Write \
                 informative, engaging articles for property buyers and sellers. \
                 Structure the piece with a hook, body, and conclusion."
            }
            Self::SocialAds => {
                "You are a social media advertising specialist for real-estate \
                 agencies. Respond with a JSON array of exactly three ad variants, \
                 each using a different persuasion angle (scarcity, social proof, \
                 aspiration). Each element must be an object with 'angle' and \
                 'copy' fields. Respond with the JSON array only."
            }
            Self::NewsDiscovery => {
                "You are a real-estate market analyst. Given a region and topic, \
                 list current newsworthy developments a local agency could comment \
                 on, one per line, each with a one-sentence summary."
            }
            Self::NewsRewrite => {
                "You are an editor for a real-estate agency newsletter. Rewrite \
                 the provided article in the agency's voice: concise, neutral, and \
                 relevant to local buyers and sellers."
            }
            Self::ImagePrompt => {
                "You craft prompts for an image generation model. Produce a single \
                 vivid, concrete prompt describing a photorealistic real-estate \
                 marketing image. Output the prompt text only."
            }
        }
    }
}

fn field<'a>(data: &'a Value, key: &str) -> &'a str {
    data.get(key).and_then(Value::as_str).unwrap_or("")
}

/// Substitute the payload's fields into the intent-specific user template.
/// Missing fields substitute as empty strings; the model copes with sparse
/// input better than the endpoint rejecting it.
pub fn build_user_prompt(prompt_type: PromptType, data: &Value) -> String {
    match prompt_type {
        PromptType::Listing => format!(
            "Write a listing description for this property.\n\
             Type: {}\nLocation: {}\nBedrooms: {}\nBathrooms: {}\nSize: {}\n\
             Price: {}\nKey features: {}\nTone: {}",
            field(data, "property_type"),
            field(data, "location"),
            field(data, "bedrooms"),
            field(data, "bathrooms"),
            field(data, "size"),
            field(data, "price"),
            field(data, "features"),
            field(data, "tone"),
        ),
        PromptType::Blog => format!(
            "Write a blog post.\nTopic: {}\nTarget audience: {}\nKeywords: {}\nDesired length: {}",
            field(data, "topic"),
            field(data, "audience"),
            field(data, "keywords"),
            field(data, "length"),
        ),
        PromptType::SocialAds => format!(
            "Create ad variants for this campaign.\nProperty or offer: {}\n\
             Audience: {}\nCall to action: {}",
            field(data, "subject"),
            field(data, "audience"),
            field(data, "call_to_action"),
        ),
        PromptType::NewsDiscovery => format!(
            "Region: {}\nTopic: {}",
            field(data, "region"),
            field(data, "topic"),
        ),
        PromptType::NewsRewrite => format!(
            "Rewrite this article:\n\n{}",
            field(data, "article"),
        ),
        PromptType::ImagePrompt => format!(
            "Subject: {}\nStyle notes: {}",
            field(data, "subject"),
            field(data, "style"),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_known_prompt_types() {
        assert_eq!(PromptType::parse("listing").unwrap(), PromptType::Listing);
        assert_eq!(PromptType::parse("social_ads").unwrap(), PromptType::SocialAds);
        assert!(matches!(
            PromptType::parse("haiku"),
            Err(GenerateError::InvalidPromptType(_))
        ));
    }

    #[test]
    fn listing_prompt_substitutes_fields() {
        let data = json!({
            "property_type": "apartment",
            "location": "Lisbon",
            "bedrooms": "3",
        });
        let prompt = build_user_prompt(PromptType::Listing, &data);
        assert!(prompt.contains("Type: apartment"));
        assert!(prompt.contains("Location: Lisbon"));
        // Missing fields become empty, not errors
        assert!(prompt.contains("Price: \n"));
    }

    #[test]
    fn only_text_intents_want_plain_text() {
        assert!(PromptType::Listing.wants_plain_text());
        assert!(PromptType::NewsRewrite.wants_plain_text());
        assert!(!PromptType::SocialAds.wants_plain_text());
        assert!(!PromptType::ImagePrompt.wants_plain_text());
    }
}
