use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::session::state::PromptSelection;

/// One task-1 chart prompt: an image served from the audio/asset directory
/// plus the description shown to the candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartPrompt {
    pub image: String,
    pub description: String,
}

/// Immutable, externally-provided writing prompt material. The engine only
/// ever draws indices into these sequences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptBank {
    pub task1_charts: Vec<ChartPrompt>,
    pub task2_topics: Vec<String>,
}

impl PromptBank {
    pub fn new(task1_charts: Vec<ChartPrompt>, task2_topics: Vec<String>) -> Self {
        assert!(!task1_charts.is_empty(), "task-1 chart bank must not be empty");
        assert!(!task2_topics.is_empty(), "task-2 topic bank must not be empty");

        Self {
            task1_charts,
            task2_topics,
        }
    }

    /// The built-in chart and essay-topic banks.
    pub fn builtin() -> Self {
        let charts = [
            (
                "chart1.png",
                "CO2 emissions per person in the UK, Sweden, Italy, and Portugal from 1967-2007",
            ),
            (
                "chart2.png",
                "Men and women in further education in Britain across three time periods",
            ),
            (
                "chart3.png",
                "Maps showing changes in the town of Springer from 1970 until now",
            ),
            (
                "chart4.png",
                "Diagram showing the recycling process of aluminum drink cans",
            ),
            (
                "chart5.png",
                "Pie charts showing age demographics in Oman and Spain in 2005 and projections for 2055",
            ),
            (
                "chart6.png",
                "Table showing data about underground railway systems in six major cities",
            ),
        ];

        let topics = [
            "Some people believe that universities should focus on providing academic skills, while others think that universities should prepare students for their future careers. Discuss both views and give your opinion.",
            "In many countries, the amount of crime committed by teenagers is increasing. What are the causes of this, and what solutions can you suggest?",
            "Some people think that the government should provide free healthcare for all citizens. Others believe that individuals should pay for their own healthcare. Discuss both views and give your opinion.",
            "Some people think that children should be taught how to manage money at school. Others believe that this is the responsibility of parents. Discuss both views and give your opinion.",
            "Some people believe that technology has made our lives too complex and that we should return to a simpler way of life. To what extent do you agree or disagree?",
            "Some people think that the best way to reduce crime is to give longer prison sentences. Others, however, believe there are better alternative ways of reducing crime. Discuss both views and give your opinion.",
            "Some people think that all university students should study whatever they like. Others believe that they should only be allowed to study subjects that will be useful in the future, such as those related to science and technology. Discuss both views and give your opinion.",
            "Some people think that governments should spend money on measures to save languages with few speakers from dying out completely. Others think this is a waste of financial resources. Discuss both views and give your opinion.",
            "Some people think that the increasing use of computers and mobile phones for communication has had a negative effect on young people's reading and writing skills. To what extent do you agree or disagree?",
            "Some people think that the government should ban dangerous sports, while others think people should have freedom to do any sports or activity. Discuss both views and give your opinion.",
            "Some people think that the teenage years are the happiest times of most people's lives. Others think that adult life brings more happiness, in spite of greater responsibilities. Discuss both views and give your opinion.",
            "Some people think that parents should teach children how to be good members of society. Others, however, believe that school is the place to learn this. Discuss both views and give your opinion.",
            "Some people think that the main purpose of schools is to turn children into good citizens and workers, rather than to benefit them as individuals. To what extent do you agree or disagree?",
            "Some people think that the main environmental problem facing by the world is the loss of particular species of plants and animals. Others believe that there are more important environmental problems. Discuss both views and give your opinion.",
            "Some people think that the best way to solve global environmental problems is to increase the cost of fuel. To what extent do you agree or disagree?",
            "Some people think that schools should select students according to their academic abilities, while others believe that it is better to have students with different abilities studying together. Discuss both views and give your opinion.",
            "Some people think that the government is wasting money on the arts and that this money could be better spent elsewhere. To what extent do you agree or disagree?",
            "Some people think that all young people should be required to have full-time education until they are at least 18 years old. To what extent do you agree or disagree?",
            "Some people think that in order to prevent illness and disease, governments should make efforts in reducing environmental pollution and housing problems. To what extent do you agree or disagree?",
            "Some people think that the increasing business and cultural contact between countries brings many positive effects. Others say that it causes the loss of national identities. Discuss both sides and give your opinion.",
            "Some people think that young people should be required to do unpaid work helping people in the community. To what extent do you agree or disagree?",
            "Some people think that the news media nowadays have influenced people's lives in negative ways. To what extent do you agree or disagree?",
            "Some people think that robots are very important for humans' future development. Others, however, think that robots are a dangerous invention that could have negative effects on society. Discuss both views and give your opinion.",
            "Some people think that the government should provide assistance to all kinds of artists including painters, musicians and poets. Others think that it is a waste of money. Discuss both views and give your opinion.",
        ];

        Self::new(
            charts
                .iter()
                .map(|(image, description)| ChartPrompt {
                    image: image.to_string(),
                    description: description.to_string(),
                })
                .collect(),
            topics.iter().map(|s| s.to_string()).collect(),
        )
    }
}

/// Draw the writing prompts for one attempt: uniform over each bank. Called
/// exactly once per session, at the Writing-phase entry transition, with an
/// injectable random source so tests are deterministic.
pub fn select_prompts(rng: &mut impl Rng, bank: &PromptBank) -> PromptSelection {
    PromptSelection {
        task1: rng.gen_range(0..bank.task1_charts.len()),
        task2: rng.gen_range(0..bank.task2_topics.len()),
    }
}
