use podcast_core::types::Speaker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostRole {
    Questioner,
    Explainer,
    Critical,
    Balanced,
}

#[derive(Debug, Clone, Copy)]
pub struct HostProfile {
    pub role: HostRole,
    pub speech_rate_wpm: f32,
    pub energy: f32,
    pub voice_id: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct ConversationFlow {
    pub interruption_rate: f32,
    pub agreement_rate: f32,
    pub follow_up_rate: f32,
    pub transitions: &'static [&'static str],
}

#[derive(Debug, Clone, Copy)]
pub struct StructuralTemplates {
    pub intro: &'static str,
    pub ad_break: &'static str,
    pub outro: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct Style {
    pub id: &'static str,
    pub host1: HostProfile,
    pub host2: HostProfile,
    pub narrator_voice: &'static str,
    pub flow: ConversationFlow,
    pub templates: StructuralTemplates,
    /// Only meaningful for `debate_format`; `None` elsewhere.
    pub debate_agreement_rate: Option<f32>,
}

impl Style {
    pub fn voice_for(&self, speaker: Speaker) -> &'static str {
        match speaker {
            Speaker::Host1 => self.host1.voice_id,
            Speaker::Host2 => self.host2.voice_id,
            Speaker::Narrator => self.narrator_voice,
        }
    }

    pub fn host_role(&self, speaker: Speaker) -> Option<HostRole> {
        match speaker {
            Speaker::Host1 => Some(self.host1.role),
            Speaker::Host2 => Some(self.host2.role),
            Speaker::Narrator => None,
        }
    }

    pub fn speaker_for_role(&self, role: HostRole) -> Option<Speaker> {
        if self.host1.role == role {
            Some(Speaker::Host1)
        } else if self.host2.role == role {
            Some(Speaker::Host2)
        } else {
            None
        }
    }

    /// `agreement_rate` defaults to 0.15 for styles that don't set it
    /// explicitly (only `debate_format` does); `opposition_rate` is always
    /// computed from it so the two can never drift out of sync.
    pub fn agreement_rate(&self) -> f32 {
        self.debate_agreement_rate.unwrap_or(0.15)
    }

    pub fn opposition_rate(&self) -> f32 {
        1.0 - self.agreement_rate()
    }
}

pub fn find(id: &str) -> Option<&'static Style> {
    STYLES.iter().find(|s| s.id == id)
}

pub const STYLE_IDS: &[&str] = &[
    "layperson",
    "classroom",
    "tech_interview",
    "journal_club",
    "npr_calm",
    "news_flash",
    "tech_energetic",
    "investigative",
    "debate_format",
];

pub static STYLES: &[Style] = &[
    Style {
        id: "layperson",
        host1: HostProfile {
            role: HostRole::Questioner,
            speech_rate_wpm: 150.0,
            energy: 0.6,
            voice_id: "voice-warm-1",
        },
        host2: HostProfile {
            role: HostRole::Explainer,
            speech_rate_wpm: 145.0,
            energy: 0.5,
            voice_id: "voice-warm-2",
        },
        narrator_voice: "voice-narrator-neutral",
        flow: ConversationFlow {
            interruption_rate: 0.1,
            agreement_rate: 0.3,
            follow_up_rate: 0.4,
            transitions: &["So what you're saying is...", "That makes sense, and...", "Okay, building on that..."],
        },
        templates: StructuralTemplates {
            intro: "Welcome back to the show! Today we're diving into {topic} — stick around, this one's fascinating.",
            ad_break: "Quick break, we'll be right back to finish unpacking {topic}.",
            outro: "That's a wrap on {topic}. Thanks for listening, and we'll catch you next time.",
        },
        debate_agreement_rate: None,
    },
    Style {
        id: "classroom",
        host1: HostProfile {
            role: HostRole::Explainer,
            speech_rate_wpm: 140.0,
            energy: 0.4,
            voice_id: "voice-instructor",
        },
        host2: HostProfile {
            role: HostRole::Questioner,
            speech_rate_wpm: 150.0,
            energy: 0.5,
            voice_id: "voice-student",
        },
        narrator_voice: "voice-narrator-neutral",
        flow: ConversationFlow {
            interruption_rate: 0.05,
            agreement_rate: 0.4,
            follow_up_rate: 0.5,
            transitions: &["Let's move on to the next point.", "Now, to build on that idea..."],
        },
        templates: StructuralTemplates {
            intro: "Welcome to today's lesson on {topic}. Let's get started.",
            ad_break: "Before we continue with {topic}, a short break.",
            outro: "That concludes today's lesson on {topic}. See you next class.",
        },
        debate_agreement_rate: None,
    },
    Style {
        id: "tech_interview",
        host1: HostProfile {
            role: HostRole::Questioner,
            speech_rate_wpm: 155.0,
            energy: 0.55,
            voice_id: "voice-interviewer",
        },
        host2: HostProfile {
            role: HostRole::Explainer,
            speech_rate_wpm: 150.0,
            energy: 0.5,
            voice_id: "voice-expert",
        },
        narrator_voice: "voice-narrator-neutral",
        flow: ConversationFlow {
            interruption_rate: 0.08,
            agreement_rate: 0.25,
            follow_up_rate: 0.5,
            transitions: &["That's a great point, which leads to my next question...", "Interesting — can you expand on..."],
        },
        templates: StructuralTemplates {
            intro: "Today on the show we're talking about {topic} with our guest expert.",
            ad_break: "We'll be right back with more on {topic}.",
            outro: "Thanks for the great conversation about {topic}. Until next time.",
        },
        debate_agreement_rate: None,
    },
    Style {
        id: "journal_club",
        host1: HostProfile {
            role: HostRole::Critical,
            speech_rate_wpm: 150.0,
            energy: 0.45,
            voice_id: "voice-reviewer-1",
        },
        host2: HostProfile {
            role: HostRole::Explainer,
            speech_rate_wpm: 150.0,
            energy: 0.45,
            voice_id: "voice-reviewer-2",
        },
        narrator_voice: "voice-narrator-neutral",
        flow: ConversationFlow {
            interruption_rate: 0.12,
            agreement_rate: 0.2,
            follow_up_rate: 0.45,
            transitions: &["I'd push back on that a little.", "Fair, but what about the methodology..."],
        },
        templates: StructuralTemplates {
            intro: "Welcome to journal club. This week we're reviewing {topic}.",
            ad_break: "Quick pause before we dig further into {topic}.",
            outro: "That's our review of {topic} for this week.",
        },
        debate_agreement_rate: None,
    },
    Style {
        id: "npr_calm",
        host1: HostProfile {
            role: HostRole::Balanced,
            speech_rate_wpm: 135.0,
            energy: 0.3,
            voice_id: "voice-calm-1",
        },
        host2: HostProfile {
            role: HostRole::Balanced,
            speech_rate_wpm: 135.0,
            energy: 0.3,
            voice_id: "voice-calm-2",
        },
        narrator_voice: "voice-narrator-calm",
        flow: ConversationFlow {
            interruption_rate: 0.02,
            agreement_rate: 0.5,
            follow_up_rate: 0.3,
            transitions: &["Let's take a moment to consider...", "Which brings us to..."],
        },
        templates: StructuralTemplates {
            intro: "From the studio, a closer look at {topic}.",
            ad_break: "Support for this program comes from our listeners. Back in a moment.",
            outro: "That's our look at {topic} for today. Thanks for listening.",
        },
        debate_agreement_rate: None,
    },
    Style {
        id: "news_flash",
        host1: HostProfile {
            role: HostRole::Balanced,
            speech_rate_wpm: 170.0,
            energy: 0.7,
            voice_id: "voice-anchor-1",
        },
        host2: HostProfile {
            role: HostRole::Balanced,
            speech_rate_wpm: 170.0,
            energy: 0.7,
            voice_id: "voice-anchor-2",
        },
        narrator_voice: "voice-narrator-news",
        flow: ConversationFlow {
            interruption_rate: 0.03,
            agreement_rate: 0.45,
            follow_up_rate: 0.2,
            transitions: &["In other developments...", "Moving on..."],
        },
        templates: StructuralTemplates {
            intro: "Breaking down {topic}, here's what you need to know.",
            ad_break: "More after this.",
            outro: "That's the briefing on {topic}. Back soon with more.",
        },
        debate_agreement_rate: None,
    },
    Style {
        id: "tech_energetic",
        host1: HostProfile {
            role: HostRole::Questioner,
            speech_rate_wpm: 175.0,
            energy: 0.85,
            voice_id: "voice-energetic-1",
        },
        host2: HostProfile {
            role: HostRole::Explainer,
            speech_rate_wpm: 170.0,
            energy: 0.8,
            voice_id: "voice-energetic-2",
        },
        narrator_voice: "voice-narrator-neutral",
        flow: ConversationFlow {
            interruption_rate: 0.2,
            agreement_rate: 0.35,
            follow_up_rate: 0.6,
            transitions: &["Okay, this is the cool part...", "Wait, hold on, back up..."],
        },
        templates: StructuralTemplates {
            intro: "Huge one today: {topic}. Let's get right into it!",
            ad_break: "Don't go anywhere, more on {topic} coming up.",
            outro: "That's {topic} in a nutshell. Catch you next time!",
        },
        debate_agreement_rate: None,
    },
    Style {
        id: "investigative",
        host1: HostProfile {
            role: HostRole::Critical,
            speech_rate_wpm: 140.0,
            energy: 0.5,
            voice_id: "voice-investigator",
        },
        host2: HostProfile {
            role: HostRole::Explainer,
            speech_rate_wpm: 140.0,
            energy: 0.45,
            voice_id: "voice-source",
        },
        narrator_voice: "voice-narrator-serious",
        flow: ConversationFlow {
            interruption_rate: 0.1,
            agreement_rate: 0.2,
            follow_up_rate: 0.5,
            transitions: &["But here's where it gets interesting.", "That's what they claimed, but..."],
        },
        templates: StructuralTemplates {
            intro: "What we found digging into {topic} will surprise you.",
            ad_break: "More of our investigation into {topic} after this.",
            outro: "That's what we uncovered about {topic}. We'll keep digging.",
        },
        debate_agreement_rate: None,
    },
    Style {
        id: "debate_format",
        host1: HostProfile {
            role: HostRole::Critical,
            speech_rate_wpm: 160.0,
            energy: 0.6,
            voice_id: "voice-debater-1",
        },
        host2: HostProfile {
            role: HostRole::Critical,
            speech_rate_wpm: 160.0,
            energy: 0.6,
            voice_id: "voice-debater-2",
        },
        narrator_voice: "voice-narrator-neutral",
        flow: ConversationFlow {
            interruption_rate: 0.3,
            agreement_rate: 0.15,
            follow_up_rate: 0.55,
            transitions: &["I have to disagree there.", "Let me counter that..."],
        },
        templates: StructuralTemplates {
            intro: "Tonight's debate: {topic}. Two sides, one conversation.",
            ad_break: "We'll resume the debate on {topic} shortly.",
            outro: "That's tonight's debate on {topic}. You decide who made the better case.",
        },
        debate_agreement_rate: Some(0.15),
    },
];
