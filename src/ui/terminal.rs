use super::commands::{Command, COMMAND_BOX};
use super::status_view;
use crate::models::{ChatMessage, Result, Role};
use crate::plugin::Plugin;
use crate::session::{IgnoreReason, SendOutcome, ValidateOutcome};
use colored::*;
use rustyline::{config::Configurer, error::ReadlineError, DefaultEditor};
use std::io::{self, Write};
use std::path::PathBuf;
use terminal_size::{terminal_size, Width};
use textwrap::{wrap, Options};

pub struct TerminalUI {
    plugin: Plugin,
    editor: DefaultEditor,
    history_file: PathBuf,
    width: usize,
}

pub fn terminal_width() -> usize {
    match terminal_size() {
        Some((Width(w), _)) => (w as usize).saturating_sub(2).max(20),
        None => 80,
    }
}

impl TerminalUI {
    pub fn new(plugin: Plugin) -> Result<Self> {
        let mut editor = DefaultEditor::new()?;
        editor.set_max_history_size(100)?;

        let history_file = dirs::home_dir()
            .map(|mut path| {
                path.push(".openai_widgets_history");
                path
            })
            .unwrap_or_else(|| ".openai_widgets_history".into());

        if history_file.exists() {
            let _ = editor.load_history(&history_file);
        }

        Ok(Self {
            plugin,
            editor,
            history_file,
            width: terminal_width(),
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        self.redraw()?;

        loop {
            let prompt = format!("{}", "> ".blue().bold());
            match self.editor.readline(&prompt) {
                Ok(line) => {
                    let command = line.parse::<Command>().unwrap_or_else(|_| Command::Message(line.clone()));
                    match command {
                        Command::Exit => {
                            let _ = self.editor.save_history(&self.history_file);
                            break;
                        }
                        Command::Clear => {
                            self.plugin.chat.clear();
                            self.redraw()?;
                        }
                        Command::Key(key) => {
                            self.plugin.chat.set_credential(key.clone());
                            self.plugin.status.set_credential(key);
                            self.notice("API key updated. Use /validate to check it.");
                        }
                        Command::Validate => self.validate().await?,
                        Command::Models => self.show_models(),
                        Command::Model(model) => {
                            if self.plugin.chat.select_model(&model) {
                                self.notice(&format!("Using {}", model));
                            } else {
                                self.error(&format!("Unknown model: {}", model));
                            }
                        }
                        Command::Status => {
                            self.plugin.status.check().await;
                            println!("{}", status_view::render(&self.plugin.status.snapshot()));
                        }
                        Command::Message(input) => {
                            if !input.trim().is_empty() {
                                self.editor.add_history_entry(&input)?;
                            }
                            self.handle_message(&input).await?;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("Use 'exit' to quit");
                    continue;
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    println!("Error: {}", err);
                    break;
                }
            }
        }

        Ok(())
    }

    fn redraw(&self) -> Result<()> {
        clearscreen::clear()?;
        println!("{}", COMMAND_BOX.green());
        println!();
        let snapshot = self.plugin.chat.snapshot();
        for message in &snapshot.messages {
            self.print_message(message);
        }
        io::stdout().flush()?;
        Ok(())
    }

    fn print_message(&self, message: &ChatMessage) {
        let options = Options::new(self.width).initial_indent("  ").subsequent_indent("  ");
        let text = wrap(&message.content, &options).join("\n");
        match message.role {
            Role::System => println!("{}", text.green()),
            Role::User => println!("{}{}", "> ".blue().bold(), message.content),
            Role::Assistant => println!("{}", text.cyan()),
        }
        println!();
    }

    fn notice(&self, text: &str) {
        println!("{}", text.green());
    }

    fn error(&self, text: &str) {
        let options = Options::new(self.width);
        for line in wrap(&format!("Error: {}", text), &options) {
            println!("{}", line.red());
        }
        println!();
    }

    async fn validate(&self) -> Result<()> {
        print!("{}", "Validating...".yellow());
        io::stdout().flush()?;
        let outcome = self.plugin.chat.validate_key().await;
        print!("\r{}\r", " ".repeat(self.width));
        match outcome {
            ValidateOutcome::Valid => self.notice("API key is valid."),
            ValidateOutcome::Invalid(reason) => self.error(&reason),
            ValidateOutcome::Busy => self.notice("Still waiting on the previous request."),
        }
        Ok(())
    }

    fn show_models(&self) {
        let snapshot = self.plugin.chat.snapshot();
        for option in &snapshot.model_options {
            let marker = if option.value == snapshot.selected_model { "*" } else { " " };
            println!("{} {:<24} {}", marker, option.value, option.label.dimmed());
        }
        println!();
    }

    async fn handle_message(&mut self, input: &str) -> Result<()> {
        print!("{}", "Thinking...".yellow());
        io::stdout().flush()?;

        let outcome = self.plugin.chat.send_message(input).await;
        print!("\r{}\r", " ".repeat(self.width));

        match outcome {
            SendOutcome::Replied(_) => {
                self.redraw()?;
            }
            SendOutcome::Failed(reason) => {
                println!();
                self.error(&reason);
            }
            SendOutcome::Busy => self.notice("Still waiting on the previous reply."),
            SendOutcome::Ignored(IgnoreReason::BlankInput) => {}
            SendOutcome::Ignored(IgnoreReason::NoCredential) => {
                self.error("No API key set. Use /key <key> first.");
            }
            SendOutcome::Ignored(IgnoreReason::KeyNotValidated) => {
                self.error("API key not validated yet. Run /validate first.");
            }
        }
        io::stdout().flush()?;

        Ok(())
    }
}
