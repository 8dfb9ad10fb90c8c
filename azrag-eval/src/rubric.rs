//! Few-shot rubric prompts and the metrics they score

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Clarity, tone, persona and helpfulness of the answer
pub const QUALITY_TEMPLATE: &str = r#"You are an AI evaluator. 
The "quality" metric is a measure of how well the generated answer adheres to the quality standards. The quality standards are as follows:
1. Clarity: The information should be presented in a clear, concise, and understandable manner, avoiding unnecessary jargon or complexity.
2. Tone: The tone of the answer should be appropriate for the context and audience, maintaining a professional and respectful demeanor.
3. Persona: The answer should be consistent with the persona of the AI assistant, reflecting the expected behavior and characteristics. In our case, the AI assistant is here to help with healthcare and employee-handbook questions.
4. Helpfulness: The answer should try to be as helpful as possible. It should provide relevant information from the context and never be lazy. 

Score the answer between one to five stars. One star indicates poor quality, while five stars indicate excellent quality.


question: What does my healthcare plan cost per month?
context: Your healthcare plan costs $100 per month. Your dental coverage includes two cleanings per year, and your vision coverage includes an annual eye exam and a $150 allowance for frames or contact lenses. You can choose between a PPO and an HMO plan, with the PPO offering more flexibility in choosing healthcare providers and the HMO providing lower out-of-pocket costs. The plan also includes a prescription drug benefit with a $10 copay for generic drugs and a $30 copay for brand-name drugs. In addition, you have access to a telemedicine service for virtual doctor visits at no additional cost.
answer: $100, check the sources for more information.
thoughts: The answer is too short and does not adequetly address the question. The answer sounds terse and unhelpful. It is also being lazy and directing the user to check the sources even though it has all the relevant context. It should be rated 1 star.
stars: 1

question: What does my healthcare plan cost per month?
context: Your healthcare plan costs $100 per month. In the bustling streets of Tokyo, the latest advancements in robotics are seamlessly integrated into daily life, from automated restaurant servers to sophisticated cleaning robots in public spaces. Meanwhile, halfway across the world, the serene landscapes of southern Pennsylvania are a haven for nature enthusiasts, boasting picturesque hiking trails and abundant wildlife. As the world becomes more interconnected, the field of renewable energy continues to evolve, with innovations like floating solar farms and advanced wind turbines pushing the boundaries of sustainable power generation. Amidst these technological and environmental shifts, the art world remains ever vibrant, with contemporary artists drawing inspiration from these changes to create thought-provoking works that challenge societal norms and provoke deep reflection. 
answer: Your healthcare plan costs $100 per month. It includes dental coverage for two cleanings per year and vision coverage with an annual eye exam and a $150 allowance for frames or contact lenses. You can choose between a PPO and an HMO plan; the PPO offers more flexibility in selecting healthcare providers, while the HMO has lower out-of-pocket costs. The plan also includes a prescription drug benefit, with a $10 copay for generic drugs and a $30 copay for brand-name drugs. Additionally, you have access to a telemedicine service for virtual doctor visits at no extra cost.
thoughts: The answer is clear, detailed, and provides all the relevant information from the context. It is helpful and addresses the question effectively. It should be rated 5 stars.
stars: 5


question: {{question}}
context: {{context}}
answer: {{answer}}
thoughts:
stars:
"#;

/// Agreement with the ground truth, rated 1, 3 or 5
pub const CORRECTNESS_TEMPLATE: &str = r#"You are an AI evaluator. 
The "correctness metric" is a measure of if the generated answer is correct based on the ground truth answer. You will be given the generated answer and the ground truth answer. You need to compare them and score the content between one to five stars using the following rating scale:
One star: The answer is incorrect
Three stars: The answer is partially correct, but could be missing some key context or nuance that makes it potentially misleading or incomplete compared with the ground truth.  
Five stars: The answer is correct

This rating value should always be either 1, 3, or 5. 


question: What does my healthcare plan cost per month?
truth: Your healthcare plan costs $200 per month
answer: Your healthcare plan costs $200 per month
thoughts: The answer is correct, so it should be rated 5 stars.
stars: 5

question: What does my healthcare plan cost per month?
truth: Your healthcare plan costs $100 per month
answer: Your healthcare plan costs $200 per month
thoughts: The costs differ between the truth and the answer, so it is completely incorrect, so it should be rated 1 star.
stars: 1


question: {{question}}
ground_truth: {{ground_truth}}
answer: {{answer}}
thoughts:
stars:
"#;

/// How strongly the answer admits it does not know
pub const DONT_KNOW_TEMPLATE: &str = r#"You are an AI evaluator. 
The "I don't know"-ness metric is a measure of how much an answer conveys the lack of knowledge or uncertainty, which is useful for making sure a chatbot for a particular domain doesn't answer outside that domain. Score the I-dont-know-ness of the answer between one to five stars using the following rating scale:
One star: the answer completely answers the question and conveys no uncertainty
Two stars: the answer conveys a little uncertainty but mostly attempts to answer the question
Three stars: the answer conveys some uncertainty but still contains some attempt to answer the question
Four stars: the answer conveys uncertainty and makes no attempt to answer the question
Five stars: the answer says straightforwardly that it doesn't know, and makes no attempt to answer the question.

This rating value should always be an integer between 1 and 5. So the rating produced should be 1 or 2 or 3 or 4 or 5.


question: What are the main goals of Perseverance Mars rover mission?
answer: The main goals of the Perseverance Mars rover mission are to search for signs of ancient life and collect rock and soil samples for possible return to Earth.
stars: 1

question: What field did Marie Curie excel in?
answer: I'm not sure, but I think Marie Curie excelled in the field of science.
stars: 2

question: What are the main components of the Mediterranean diet?
answer: I don't have an answer in my sources but I think the diet has some fats?
stars: 3

question: What are the main attractions of the Queen's Royal Castle?
answer: I'm not certain. Perhaps try rephrasing the question?
stars: 4

question: Where were The Beatles formed?
answer: I'm sorry, I don't know, that answer is not in my sources.
stars: 5


question: {{question}}
answer: {{answer}}
stars:
"#;

/// How well the answer ignores irrelevant context
pub const FOCUS_TEMPLATE: &str = r#"You are an AI evaluator.
The "focus" metric is a measure of how well the generated answer ignores irrelevant information in the context and focuses on the relevant content. Score the answer between one to five stars using the following rating scale:
One star: The answer contains a significant amount of irrelevant information. Almost all of the irrelevant information from the context is included in the answer. 
Two stars: The answer contains some irrelevant information. Approximately half of the irrelevant information from the context is included in the answer.
Three stars: The answer contains a moderate amount of irrelevant information. A few pieces of irrelevant information from the context are included in the answer, but the majority of the answer is relevant.
Four stars: The answer ignores almost all of the irrelevant content, but some minor irrelevant information is included. 
Five stars: The answer ignores all irrelevant information and focuses only on the relevant content. 


question: What does my healthcare plan cost per month?
context: Your healthcare plan costs $100 per month. In the bustling streets of Tokyo, the latest advancements in robotics are seamlessly integrated into daily life, from automated restaurant servers to sophisticated cleaning robots in public spaces. Meanwhile, halfway across the world, the serene landscapes of southern Pennsylvania are a haven for nature enthusiasts, boasting picturesque hiking trails and abundant wildlife. As the world becomes more interconnected, the field of renewable energy continues to evolve, with innovations like floating solar farms and advanced wind turbines pushing the boundaries of sustainable power generation. Amidst these technological and environmental shifts, the art world remains ever vibrant, with contemporary artists drawing inspiration from these changes to create thought-provoking works that challenge societal norms and provoke deep reflection. 
answer: Your healthcare plan costs $100 per month. The context also mentions various other topics: the integration of robotics into daily life in Tokyo, the natural beauty of southern Pennsylvania, advancements in renewable energy like floating solar farms and advanced wind turbines, and the influence of these technological and environmental changes on contemporary art.
thoughts: The context contains an answer to the healthcare plan cost question which is relevant, but also a large amount of irrelevant content. The answer mentions of all the irrelevant information from the context, so it should be rated 1 star.
stars: 1

question: What does my healthcare plan cost per month?
context: Your healthcare plan costs $100 per month. In the bustling streets of Tokyo, the latest advancements in robotics are seamlessly integrated into daily life, from automated restaurant servers to sophisticated cleaning robots in public spaces. Meanwhile, halfway across the world, the serene landscapes of southern Pennsylvania are a haven for nature enthusiasts, boasting picturesque hiking trails and abundant wildlife. As the world becomes more interconnected, the field of renewable energy continues to evolve, with innovations like floating solar farms and advanced wind turbines pushing the boundaries of sustainable power generation. Amidst these technological and environmental shifts, the art world remains ever vibrant, with contemporary artists drawing inspiration from these changes to create thought-provoking works that challenge societal norms and provoke deep reflection. 
answer: Your healthcare plan costs $100 per month. The field of renewable energy continues to evolve, which may have an impact on the cost of your healthcare plan in the future.
thoughts: The context contains an answer to the healthcare plan cost question which is relevant, but also some irrelevant content. The answer includes a piece of irrelevant information about renewable energy, so it should be rated 2 stars.
stars: 2

question: What does my healthcare plan cost per month?
context: Your healthcare plan costs $100 per month. In the bustling streets of Tokyo, the latest advancements in robotics are seamlessly integrated into daily life, from automated restaurant servers to sophisticated cleaning robots in public spaces. Meanwhile, halfway across the world, the serene landscapes of southern Pennsylvania are a haven for nature enthusiasts, boasting picturesque hiking trails and abundant wildlife. As the world becomes more interconnected, the field of renewable energy continues to evolve, with innovations like floating solar farms and advanced wind turbines pushing the boundaries of sustainable power generation. Amidst these technological and environmental shifts, the art world remains ever vibrant, with contemporary artists drawing inspiration from these changes to create thought-provoking works that challenge societal norms and provoke deep reflection. 
answer: Your healthcare plan costs $100 per month. 
thoughts: The context contains an answer to the healthcare plan cost question which is relevant and the answer is focused only on the relevant content. No irrelevant content made it through. It should be rated 5 stars.
stars: 5



question: {{question}}
context: {{context}}
answer: {{answer}}
thoughts:
stars:
"#;

/// How relevant the retrieved context is to the question
pub const RETRIEVAL_RELEVANCE_TEMPLATE: &str = r#"You are an AI evaluator. 
The "Retrieval Relevance metric is a measure of how relevant the provided context is to the user question. Score the content between one to five stars using the following rating scale:
One star: None of the content is relevant
Two stars: A small portion of the content is relevant
Three stars: Approximately half of the content is relevant
Four stars: The majority of the content is relevant
Five stars: All of the content is relevant

This rating value should always be an integer between 1 and 5. So the rating produced should be 1 or 2 or 3 or 4 or 5.

question: What does my healthcare plan say about Eye & Dental?
Context: 
Source 1 - The main goals of the Perseverance Mars rover mission are to search for signs of ancient life and collect rock and soil samples for possible return to Earth.
Source 2 - Marie Curie excelled in the field of science.
Source 3 - The sky is blue
thoughts: The first source is completely unrelated to the question. The second source is also irrelevant. The third source is also irrelevant. Therefore, the rating should be 1 star.
stars: 1

question: What does my healthcare plan say about Eye & Dental?
Context: 
Source 1 - Your healthcare plan covers eye and dental care [employee benefits handbook]
Source 2 - You receive benefits up to $500 for eye and dental care annually [employee benefits handbook]
Source 3 - You can visit any dentist or optometrist in the network for eye and dental care [employee benefits handbook]
thoughts: The first source talks about eye and dental care which is relevant to the question.  The second source also talks about eye and dental care. The third source also talks about eye and dental care. Therefore, the rating should be 5 stars.
stars: 5


question: {{question}}
context: {{context}}
stars:
"#;

/// A named quality dimension scored by one rubric prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Quality,
    Correctness,
    DontKnow,
    Focus,
    RetrievalRelevance,
}

const DEFAULT_SET: [Metric; 4] = [
    Metric::Quality,
    Metric::Correctness,
    Metric::Focus,
    Metric::RetrievalRelevance,
];

const ALL: [Metric; 5] = [
    Metric::Quality,
    Metric::Correctness,
    Metric::DontKnow,
    Metric::Focus,
    Metric::RetrievalRelevance,
];

impl Metric {
    /// Metrics run unless asked otherwise; `DontKnow` is opt-in
    pub fn default_set() -> &'static [Metric] {
        &DEFAULT_SET
    }

    pub fn all() -> &'static [Metric] {
        &ALL
    }

    /// Heading used in reports
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Quality => "Quality",
            Metric::Correctness => "Correctness",
            Metric::DontKnow => "Don't Know",
            Metric::Focus => "Focus",
            Metric::RetrievalRelevance => "Retrieval Relevance",
        }
    }

    pub fn template(&self) -> &'static str {
        match self {
            Metric::Quality => QUALITY_TEMPLATE,
            Metric::Correctness => CORRECTNESS_TEMPLATE,
            Metric::DontKnow => DONT_KNOW_TEMPLATE,
            Metric::Focus => FOCUS_TEMPLATE,
            Metric::RetrievalRelevance => RETRIEVAL_RELEVANCE_TEMPLATE,
        }
    }

    /// Ratings the rubric asks for
    pub fn scale(&self) -> &'static [u8] {
        match self {
            Metric::Correctness => &[1, 3, 5],
            _ => &[1, 2, 3, 4, 5],
        }
    }

    pub fn uses_ground_truth(&self) -> bool {
        matches!(self, Metric::Correctness)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match normalized.as_str() {
            "quality" => Ok(Metric::Quality),
            "correctness" => Ok(Metric::Correctness),
            "dontknow" | "idontknow" => Ok(Metric::DontKnow),
            "focus" => Ok(Metric::Focus),
            "retrievalrelevance" | "relevance" => Ok(Metric::RetrievalRelevance),
            _ => Err(format!("Unknown metric: {}", s)),
        }
    }
}

/// Values substituted into a rubric template
#[derive(Debug, Clone, Default)]
pub struct PromptInputs<'a> {
    pub question: &'a str,
    pub context: &'a str,
    pub answer: &'a str,
    pub ground_truth: &'a str,
}

/// Literal placeholder replacement; unknown braces are left alone
pub fn render_prompt(template: &str, inputs: &PromptInputs<'_>) -> String {
    template
        .replace("{{question}}", inputs.question)
        .replace("{{context}}", inputs.context)
        .replace("{{answer}}", inputs.answer)
        .replace("{{ground_truth}}", inputs.ground_truth)
}
