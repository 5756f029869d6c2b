//! Character listing and the premium character creator.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use hamdam_shared::types::{CharacterId, UserId};
use hamdam_store::Character;

use crate::error::{ClientError, Result};

pub const CREATOR_AGE_RANGE: RangeInclusive<u32> = 18..=55;
pub const MAX_INTERESTS: usize = 3;

fn preset(id: &str, name: &str, age: u32, tags: &[&str], bio: &str, prompt: &str) -> Character {
    Character {
        id: CharacterId::from(id),
        name: name.to_string(),
        age,
        image_url: format!("https://assets.hamdam.app/characters/{id}.jpg"),
        bio: bio.to_string(),
        system_prompt: prompt.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        ..Character::default()
    }
}

/// Public characters a fresh installation starts with.
pub fn default_characters() -> Vec<Character> {
    vec![
        preset(
            "char_sara",
            "Sara",
            24,
            &["Friend", "Cheerful"],
            "A cheerful architecture student who loves long walks and old films.",
            "You are Sara, a 24-year-old architecture student. You are warm, curious and \
             always ready with a follow-up question. Keep replies short and conversational.",
        ),
        preset(
            "char_nima",
            "Nima",
            31,
            &["Mentor", "Calm"],
            "A calm software engineer who enjoys chess, hiking and explaining things simply.",
            "You are Nima, a 31-year-old software engineer. You are patient and thoughtful, \
             and you like helping people think problems through.",
        ),
        preset(
            "char_leila",
            "Leila",
            27,
            &["Friend", "Playful"],
            "A playful musician with a story for every song she knows.",
            "You are Leila, a 27-year-old musician. You are playful and witty and you love \
             sharing music recommendations.",
        ),
    ]
}

/// Characters `viewer` may see, optionally narrowed to one tag.
pub fn visible_characters<'a>(
    characters: &'a [Character],
    viewer: Option<&UserId>,
    is_admin: bool,
    tag: Option<&str>,
) -> Vec<&'a Character> {
    characters
        .iter()
        .filter(|c| c.is_visible_to(viewer, is_admin))
        .filter(|c| tag.map_or(true, |t| c.has_tag(t)))
        .collect()
}

/// Every tag used by a visible character, first-seen order.
pub fn tags_in_use(characters: &[&Character]) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in characters.iter().flat_map(|c| c.tags.iter()) {
        if !tags.contains(tag) {
            tags.push(tag.clone());
        }
    }
    tags
}

/// Insert `character`, or replace the one with the same id.
pub fn upsert(characters: &mut Vec<Character>, character: Character) {
    match characters.iter_mut().find(|c| c.id == character.id) {
        Some(existing) => *existing = character,
        None => characters.push(character),
    }
}

/// Answers collected by the character creator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterDraft {
    pub name: String,
    pub age: u32,
    pub style: String,
    pub hair_style: String,
    pub hair_color: String,
    pub eye_color: String,
    pub body_type: String,
    pub occupation: String,
    pub personality: String,
    pub relationship: String,
    #[serde(default)]
    pub interests: Vec<String>,
    /// Portrait produced from [`portrait_prompt`](Self::portrait_prompt).
    pub image_url: String,
}

impl CharacterDraft {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ClientError::Validation("Please give the character a name".into()));
        }
        if !CREATOR_AGE_RANGE.contains(&self.age) {
            return Err(ClientError::Validation(format!(
                "Age must be between {} and {}",
                CREATOR_AGE_RANGE.start(),
                CREATOR_AGE_RANGE.end()
            )));
        }
        if self.interests.len() > MAX_INTERESTS {
            return Err(ClientError::Validation(format!(
                "Pick at most {MAX_INTERESTS} interests"
            )));
        }
        if self.image_url.trim().is_empty() {
            return Err(ClientError::Validation("Generate a portrait first".into()));
        }
        Ok(())
    }

    /// Image prompt describing the character's appearance.
    pub fn portrait_prompt(&self) -> String {
        let mut prompt = format!("portrait of a {}-year-old person", self.age);
        let traits = [
            (&self.hair_style, "hair style"),
            (&self.hair_color, "hair"),
            (&self.eye_color, "eyes"),
            (&self.body_type, "build"),
        ];
        for (value, noun) in traits {
            if !value.trim().is_empty() {
                prompt.push_str(&format!(", {} {}", value.trim().to_lowercase(), noun));
            }
        }
        if !self.style.trim().is_empty() {
            prompt.push_str(&format!(", {} style", self.style.trim().to_lowercase()));
        }
        prompt
    }

    fn system_prompt(&self) -> String {
        let mut prompt = format!(
            "You are {}, a {}-year-old virtual companion. Your style is {}. \
             You have {} {} hair and {} eyes, with a {} build. \
             You work as a {} and your personality is {}. \
             Your relationship with the user is: {}.",
            self.name.trim(),
            self.age,
            self.style,
            self.hair_style,
            self.hair_color,
            self.eye_color,
            self.body_type,
            self.occupation,
            self.personality,
            self.relationship,
        );
        if !self.interests.is_empty() {
            prompt.push_str(&format!(" Your interests include {}.", self.interests.join(", ")));
        }
        prompt
    }

    /// Build the private character owned by `creator`.
    pub fn into_character(self, creator: &UserId) -> Result<Character> {
        self.validate()?;

        let system_prompt = self.system_prompt();
        let bio = format!(
            "A {}-year-old character named {}. A {} with a {} personality.",
            self.age,
            self.name.trim(),
            self.occupation,
            self.personality
        );
        let tags = [&self.personality, &self.occupation, &self.relationship]
            .into_iter()
            .cloned()
            .chain(self.interests.iter().cloned())
            .filter(|t| !t.trim().is_empty())
            .collect();

        Ok(Character {
            id: CharacterId::new(),
            name: self.name.trim().to_string(),
            age: self.age,
            body_type: Some(self.body_type).filter(|b| !b.is_empty()),
            image_url: self.image_url,
            gif_url: None,
            bio,
            roleplay_description: None,
            system_prompt,
            tags,
            about: Default::default(),
            gallery: Vec::new(),
            is_private: true,
            creator_id: Some(creator.clone()),
        })
    }
}
