use clap::{Parser, Subcommand};
use proms_core::{
    forms::form_data_from_items, AlertService, AnswerPolicy, CoreConfig, EventBus, FollowupAction,
    FollowupActionService, FollowupActionStore, FormController, FormData, FormSchema,
};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "proms")]
#[command(about = "PROMs followup questionnaire CLI")]
struct Cli {
    /// Data directory (overrides PROMS_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List all followup actions
    List,
    /// Create a followup action for a questionnaire
    Create {
        /// Questionnaire name, e.g. moxfq
        name: String,
    },
    /// Print a followup action as JSON
    Show {
        /// Followup action id
        id: i64,
    },
    /// Print the saved answers of a followup action as form data
    FormData {
        /// Followup action id
        id: i64,
    },
    /// Submit answers from a JSON object file (question id -> answer)
    Submit {
        /// Followup action id
        id: i64,
        /// Path to the JSON form data
        file: String,
        /// Keep answers of 0 and false instead of treating them as unanswered
        #[arg(long)]
        keep_zero: bool,
    },
    /// Print the questions of a built-in questionnaire
    Schema {
        /// Questionnaire name
        #[arg(default_value = "moxfq")]
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let cfg = CoreConfig::from_values(
        cli.data_dir.or_else(|| std::env::var("PROMS_DATA_DIR").ok()),
        std::env::var("PROMS_ANSWER_POLICY").ok(),
        std::env::var("PROMS_EVENT_CAPACITY").ok(),
    )?;
    let store = Arc::new(FollowupActionStore::new(&cfg));

    match cli.command {
        Some(Commands::List) => {
            let actions = store.list().await?;
            if actions.is_empty() {
                println!("No followup actions found.");
            } else {
                for action in actions {
                    println!(
                        "ID: {}, Name: {}, Status: {}, Answers: {}",
                        action.id.unwrap_or_default(),
                        action.name.as_deref().unwrap_or("-"),
                        action.status.as_str(),
                        action.response_items.len()
                    );
                }
            }
        }
        Some(Commands::Create { name }) => {
            match store.create(FollowupAction::new(name)).await {
                Ok(action) => println!(
                    "Created followup action with ID: {}",
                    action.id.unwrap_or_default()
                ),
                Err(e) => eprintln!("Error creating followup action: {}", e),
            }
        }
        Some(Commands::Show { id }) => match store.find(id).await {
            Ok(action) => println!("{}", serde_json::to_string_pretty(&action)?),
            Err(e) => eprintln!("Error reading followup action: {}", e),
        },
        Some(Commands::FormData { id }) => match store.find(id).await {
            Ok(action) => {
                let data = form_data_from_items(&action.response_items);
                println!("{}", serde_json::to_string_pretty(&data)?);
            }
            Err(e) => eprintln!("Error reading followup action: {}", e),
        },
        Some(Commands::Submit {
            id,
            file,
            keep_zero,
        }) => {
            let raw = std::fs::read_to_string(&file)?;
            let data: FormData = serde_json::from_str(&raw)?;
            let action = store.find(id).await?;

            let policy = if keep_zero {
                AnswerPolicy::Present
            } else {
                cfg.answer_policy()
            };
            let schema = match action.name.as_deref() {
                Some(name) => FormSchema::builtin(name)?,
                None => None,
            };

            let mut controller = FormController::new(
                action,
                store.clone(),
                EventBus::new(cfg.event_capacity()),
                AlertService::new(cfg.event_capacity()),
            )
            .with_policy(policy);
            if let Some(schema) = schema {
                controller = controller.with_schema(Arc::new(schema));
            }
            controller.initialize()?;

            match controller.submit(data).await {
                Ok(saved) => println!(
                    "Saved {} answers for followup action {}",
                    saved.response_items.len(),
                    id
                ),
                Err(e) => eprintln!("Error submitting form data: {}", e),
            }
        }
        Some(Commands::Schema { name }) => match FormSchema::builtin(&name)? {
            Some(schema) => {
                println!("{} ({})", schema.title, schema.name);
                for question in &schema.questions {
                    println!("  {}: {}", question.id, question.label);
                }
            }
            None => eprintln!("Unknown questionnaire: {}", name),
        },
        None => {
            println!("Use 'proms --help' for commands");
        }
    }

    Ok(())
}
