//! Wires configuration, collaborators and the push orchestrator together

use crate::cli::args::Args;
use crate::cli::config::AppConfig;
use crate::error::{PushError, RegistryError};
use crate::logging::Logger;
use crate::push::{
    LoggerEventSink, ProtocolPusherFactory, PushConfig, PushOrchestrator, PushRequest,
    PushSummary,
};
use crate::registry::{
    ConfiguredEndpoints, Credentials, HttpTransport, RegistryTransport, TransportConfig,
};
use crate::repository::IndexResolver;
use crate::store::CacheStore;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

pub struct Runner {
    args: Args,
    config: AppConfig,
    logger: Logger,
}

impl Runner {
    /// Merge defaults, config file, environment and flags, then validate the result
    pub fn new(args: Args) -> Result<Self, PushError> {
        args.validate().map_err(RegistryError::Validation)?;

        let config = match &args.config {
            Some(path) => AppConfig::from_file(path)?,
            None => AppConfig::default(),
        };
        let config = Self::apply_args(config.with_env(), &args);
        config.validate()?;

        let logger = if config.quiet {
            Logger::new_quiet()
        } else {
            Logger::new(config.verbose)
        };

        Ok(Self {
            args,
            config,
            logger,
        })
    }

    fn apply_args(mut config: AppConfig, args: &Args) -> AppConfig {
        if let Some(cache_dir) = &args.cache_dir {
            config.cache_dir = cache_dir.clone();
        }
        if let Some(timeout) = args.timeout {
            config.timeout = timeout;
        }
        if let Some(format) = args.output {
            config.output_format = format;
        }
        config.skip_tls |= args.skip_tls;
        config.verbose |= args.verbose;
        if args.quiet {
            config.quiet = true;
            config.verbose = false;
        }
        for registry in &args.insecure_registries {
            if !config.insecure_registries.contains(registry) {
                config.insecure_registries.push(registry.clone());
            }
        }
        config
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    pub async fn run(&self) -> Result<PushSummary, PushError> {
        self.run_with_output(Box::new(std::io::stdout())).await
    }

    /// Run the push, writing the progress stream to `output`
    pub async fn run_with_output(
        &self,
        output: Box<dyn Write + Send>,
    ) -> Result<PushSummary, PushError> {
        self.logger.section("Manifest Pusher");

        let (repository, tag) = self.args.repository_and_tag();
        self.logger.verbose(&format!(
            "Repository: {}, tag: {}",
            repository,
            tag.as_deref().unwrap_or("<all>")
        ));

        let orchestrator = self.build_orchestrator()?;

        let credentials = match (&self.args.username, &self.args.password) {
            (Some(username), Some(password)) => Some(Credentials::new(username, password)),
            _ => None,
        };
        let push_config = PushConfig::new()
            .with_tag(tag.unwrap_or_default())
            .with_credentials(credentials)
            .with_format(self.config.output_format);

        let summary = orchestrator
            .run(PushRequest::new(repository, push_config, output))
            .await?;

        self.report(&summary);
        Ok(summary)
    }

    /// The single success line of a run, with per-tag details in verbose mode
    pub fn report(&self, summary: &PushSummary) {
        for pushed in &summary.pushed {
            self.logger.detail(&format!(
                "{}:{} -> {}",
                summary.canonical_name, pushed.tag, pushed.endpoint
            ));
        }
        self.logger.success(&format!(
            "Pushed {} tag(s) of {} in {}",
            summary.pushed.len(),
            summary.canonical_name,
            self.logger.format_duration(self.logger.elapsed())
        ));
    }

    fn build_orchestrator(&self) -> Result<PushOrchestrator, PushError> {
        self.logger.step("Opening local cache");
        let store = CacheStore::open(&self.config.cache_dir)?;
        self.logger.detail(&format!(
            "{} repositories in {}",
            store.repositories().len(),
            self.config.cache_dir
        ));

        let transport_config = TransportConfig {
            timeout: Duration::from_secs(self.config.timeout),
            skip_tls: self.config.skip_tls,
        };
        if transport_config.skip_tls {
            self.logger.warning("TLS certificate verification is disabled");
        }
        let transport: Arc<dyn RegistryTransport> =
            Arc::new(HttpTransport::new(&transport_config, self.logger.clone())?);

        let endpoints = ConfiguredEndpoints::new()
            .with_preferred(self.args.endpoints.clone())
            .with_configured(self.config.endpoints.clone())
            .with_insecure_registries(self.config.insecure_registries.clone());

        Ok(PushOrchestrator::new(
            Arc::new(IndexResolver::new(&self.config.default_index)),
            Arc::new(endpoints),
            Arc::new(store),
            Arc::new(ProtocolPusherFactory::new(transport, self.logger.clone())),
            Arc::new(LoggerEventSink::new(self.logger.clone())),
        )
        .with_logger(self.logger.clone()))
    }
}
