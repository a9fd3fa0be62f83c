use console::{style, Style};
use emotion_lens_core::render::{
    self, CharacterView, DisplayModel, RenderedSentence, VisualCategory, NO_CHARACTERS_MESSAGE,
};
use emotion_lens_core::service::{AnalysisMode, AnalysisResult};
use emotion_lens_core::session::{RequestState, Session};

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub fn print_result(result: &AnalysisResult, format: OutputFormat) -> anyhow::Result<()> {
    let model = render::render(result);
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&model)?),
        OutputFormat::Text => print_model(&model),
    }
    Ok(())
}

/// Prints whatever the session currently has to show for its active mode.
pub fn print_session(session: &Session, format: OutputFormat) -> anyhow::Result<()> {
    match session.state() {
        RequestState::Idle => println!("{}", style("Nothing analyzed yet.").dim()),
        RequestState::Loading => println!("{}", style("Analyzing...").dim()),
        RequestState::Error(message) => print_error(message),
        RequestState::Success(_) => match session.visible_result() {
            Some(result) => print_result(result, format)?,
            None => println!(
                "{}",
                style(format!(
                    "No {} results yet. Run :analyze.",
                    session.mode()
                ))
                .dim()
            ),
        },
    }
    Ok(())
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", style("✗").red(), style(message).red());
}

fn print_model(model: &DisplayModel) {
    match model {
        DisplayModel::Sentence(sentences) => {
            println!("{}", style("Sentence Analysis Results").bold());
            if sentences.is_empty() {
                println!("  {}", style("No sentences returned.").dim());
            }
            for sentence in sentences {
                println!(
                    "  {} {}",
                    highlight(sentence.category).apply_to(&sentence.text),
                    label(sentence)
                );
            }
        }
        DisplayModel::Character(view) => {
            println!("{}", style("Character Analysis Results").bold());
            match view {
                CharacterView::NoCharacters => {
                    println!("  {}", style(NO_CHARACTERS_MESSAGE).dim());
                }
                CharacterView::Characters(arcs) => {
                    for arc in arcs {
                        println!();
                        println!("  {}", style(format!("{}'s Emotional Journey", arc.name)).bold());
                        for sentence in &arc.sentences {
                            println!(
                                "    {} {} {}",
                                dot(sentence.category).apply_to("●"),
                                sentence.text,
                                label(sentence)
                            );
                        }
                    }
                }
            }
        }
    }
}

fn label(sentence: &RenderedSentence) -> String {
    style(format!("[{}]", sentence.label)).bold().to_string()
}

fn color256(category: VisualCategory) -> u8 {
    match category {
        VisualCategory::Yellow => 229,
        VisualCategory::Green => 157,
        VisualCategory::Orange => 215,
        VisualCategory::Purple => 183,
        VisualCategory::Blue => 117,
        VisualCategory::Lime => 191,
        VisualCategory::Red => 210,
        VisualCategory::Amber => 222,
        VisualCategory::Neutral => 252,
    }
}

fn highlight(category: VisualCategory) -> Style {
    Style::new().black().on_color256(color256(category))
}

fn dot(category: VisualCategory) -> Style {
    Style::new().color256(color256(category))
}

pub fn mode_title(mode: AnalysisMode) -> &'static str {
    match mode {
        AnalysisMode::Sentence => "Analyze Sentences",
        AnalysisMode::Character => "Analyze Characters",
    }
}
