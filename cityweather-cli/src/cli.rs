use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::{fs, sync::Arc};

use cityweather_core::{
    CityReconciler, CitySearch, CityStore, Config, ForecastAggregator, HomeAction, HomeState,
    OpenWeatherClient, SavedCity, SqliteCityStore, WeatherError, reduce,
};

use crate::output;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(
    name = "cityweather",
    version,
    about = "Weather for your saved cities"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the OpenWeather API key, language and timezone.
    Configure,

    /// Save the city at a coordinate, or refresh it if already saved.
    Add {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        /// Display name used when the city is new.
        #[arg(long)]
        name: Option<String>,
    },

    /// Search cities by name.
    Search {
        query: String,

        /// Pick one of the results and save it.
        #[arg(long)]
        add: bool,
    },

    /// List saved cities.
    List,

    /// Refetch weather for every saved city.
    Refresh,

    /// Delete a saved city by id.
    Remove { id: i64 },

    /// Hourly and daily forecast for a saved city.
    Forecast { id: i64 },

    /// Recently searched city names.
    Suggest,
}

type Reconciler = CityReconciler<OpenWeatherClient, Arc<SqliteCityStore>>;
type Search<'a> = CitySearch<'a, OpenWeatherClient, Arc<SqliteCityStore>>;

struct App {
    config: Config,
    store: Arc<SqliteCityStore>,
}

impl App {
    fn open(config: Config) -> Result<Self> {
        let path = config.database_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create data directory: {}", parent.display())
            })?;
        }
        let store = SqliteCityStore::open(&path).with_context(|| {
            format!("Failed to open city database: {}", path.display())
        })?;

        Ok(Self {
            config,
            store: Arc::new(store),
        })
    }

    fn reconciler(&self) -> Result<Reconciler> {
        let client = OpenWeatherClient::from_config(&self.config)?;
        Ok(CityReconciler::new(client, Arc::clone(&self.store)))
    }

    /// Reconciler for commands that only touch the store, usable before an
    /// API key is configured.
    fn local_reconciler(&self) -> Reconciler {
        let client = OpenWeatherClient::new(String::new(), self.config.lang.clone());
        CityReconciler::new(client, Arc::clone(&self.store))
    }

    fn city_search<'a>(&self, reconciler: &'a Reconciler) -> Search<'a> {
        let suggestions = self.config.suggested_cities.clone();
        CitySearch::new(reconciler, self.config.lang.clone())
            .with_default_suggestions(suggestions)
    }

    fn saved_city(&self, id: i64) -> Result<SavedCity> {
        match self.store.get(id)? {
            Some(city) => Ok(city),
            None => Err(WeatherError::NotFound(id).into()),
        }
    }
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let open_app = || App::open(Config::load()?);

        match self.command {
            Command::Configure => configure()?,
            Command::Add { lat, lon, name } => {
                let app = open_app()?;
                let reconciler = app.reconciler()?;
                let result = reconciler.reconcile(lat, lon, name.as_deref()).await?;
                let verb = if result.is_new { "Added" } else { "Updated" };
                println!("{verb}: {}", output::city_line(&result.city));
            }
            Command::Search { query, add } => search(&open_app()?, &query, add).await?,
            Command::List => list(&open_app()?).await?,
            Command::Refresh => refresh(&open_app()?).await?,
            Command::Remove { id } => {
                let app = open_app()?;
                let city = app.local_reconciler().remove(id)?;
                println!("Removed {} ({})", city.name, city.id);
            }
            Command::Forecast { id } => {
                let app = open_app()?;
                let city = app.saved_city(id)?;
                let aggregator = ForecastAggregator::new(app.config.timezone()?);
                let reconciler = app.reconciler()?;
                let fetcher = reconciler.fetcher();
                let forecast = aggregator
                    .fetch(fetcher, city.lat, city.lon, Utc::now())
                    .await?;

                println!("{}", output::forecast_header(&city));
                print!("{}", output::forecast(&forecast));
            }
            Command::Suggest => {
                let app = open_app()?;
                let reconciler = app.local_reconciler();
                for name in app.city_search(&reconciler).suggested_cities()? {
                    println!("{name}");
                }
            }
        }

        Ok(())
    }
}

fn configure() -> Result<()> {
    let mut config = Config::load()?;

    let api_key = inquire::Password::new("OpenWeather API key:")
        .without_confirmation()
        .with_display_mode(inquire::PasswordDisplayMode::Masked)
        .prompt()?;
    if !api_key.trim().is_empty() {
        config.api_key = Some(api_key.trim().to_string());
    }

    let lang = inquire::Text::new("Language for descriptions and city names:")
        .with_default(&config.lang)
        .prompt()?;
    config.lang = lang;

    let timezone = inquire::Text::new("Timezone for hourly labels (IANA name):")
        .with_default(&config.timezone)
        .prompt()?;
    config.timezone = timezone;
    config.timezone()?;

    config.save()?;
    let path = Config::config_file_path()?;
    println!("Saved configuration to {}", path.display());
    Ok(())
}

async fn search(app: &App, query: &str, add: bool) -> Result<()> {
    let reconciler = app.reconciler()?;
    let search = app.city_search(&reconciler);
    let results = search.search(query).await?;

    if results.is_empty() {
        println!("No cities found for '{query}'");
        return Ok(());
    }

    if !add {
        for r in &results {
            println!("{}  ({:.4}, {:.4})", r.name, r.lat, r.lon);
        }
        return Ok(());
    }

    let labels: Vec<String> = results.iter().map(|r| r.name.clone()).collect();
    let picked = inquire::Select::new("Add which city?", labels).raw_prompt()?;
    let Some(choice) = results.get(picked.index) else {
        bail!("Selected city is no longer available");
    };

    let added = search.add_city(choice.lat, choice.lon, &choice.name).await?;
    if added.is_new {
        println!("Added {} ({})", added.name, added.id);
    } else {
        println!(
            "{} is already saved ({}); weather updated",
            added.name, added.id
        );
    }
    Ok(())
}

async fn list(app: &App) -> Result<()> {
    // Without a key the default city cannot be fetched, so show what is stored.
    let state = if app.config.api_key().is_ok() {
        let reconciler = app.reconciler()?;
        reconciler.load_home(&app.config.default_city).await
    } else {
        let loaded = HomeAction::CitiesLoaded(app.store.list_all()?);
        reduce(HomeState::default(), loaded)
    };

    if let Some(current) = &state.current_location {
        println!("Added the default city: {}", current.name);
    }
    if state.cities.is_empty() {
        println!(
            "No saved cities. Add one with `cityweather search <name> --add`."
        );
    }
    for city in &state.cities {
        println!("{}", output::city_line(city));
    }
    if let Some(error) = &state.error {
        eprintln!("{error}");
    }
    Ok(())
}

async fn refresh(app: &App) -> Result<()> {
    let reconciler = app.reconciler()?;
    let loaded = HomeAction::CitiesLoaded(app.store.list_all()?);
    let mut state = reduce(HomeState::default(), loaded);

    loop {
        state = reduce(state, HomeAction::RefreshStarted);
        state = match reconciler.refresh_all().await {
            Ok(cities) => reduce(state, HomeAction::RefreshFinished(cities)),
            Err(e) => reduce(state, HomeAction::Failed(e.user_message())),
        };

        let Some(error) = &state.error else {
            break;
        };
        eprintln!("{error}");
        if !confirm_retry() {
            break;
        }
        state = reduce(state, HomeAction::ErrorDismissed);
    }

    for city in &state.cities {
        println!("{}", output::city_line(city));
    }
    Ok(())
}

/// A prompt that cannot be shown (no terminal) counts as "no".
fn confirm_retry() -> bool {
    inquire::Confirm::new("Refresh failed. Try again?")
        .with_default(false)
        .prompt()
        .unwrap_or(false)
}
