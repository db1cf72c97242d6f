//! PipelineEngine - Central service over the pipeline components

use audit::{AuditEntry, AuditEventType, AuditLogger, AuditStats};
use chrono::{DateTime, Utc};
use followup::{FollowUpDetector, FollowUpSignal, SignalLedger};
use matching::{MatchBreakdown, MatchingEngine, RankedCandidate};
use pipeline::{
    Conversion, EngagementDraft, EngagementTransition, IdeaTransition, PipelineRepository,
    PipelineStateMachine, PromotionBasis,
};
use registry::CompetencyRegistry;
use shared::{
    Engagement, EngagementId, EngagementStatus, EngineConfig, EngineError, Idea, IdeaId,
    IdeaStatus, Interaction, Resource, ResourceId, Result, TrackedEntity, Vote, VoteValue,
    VoterId,
};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};
use voting::{VoteBreakdown, VoteOutcome, VoteReceipt, VotingAggregator};

/// Pipeline engine
///
/// All methods take `&self`; share one engine across threads with `Arc`.
pub struct PipelineEngine<R> {
    config: EngineConfig,
    registry: CompetencyRegistry,
    matcher: MatchingEngine,
    votes: VotingAggregator,
    pipeline: PipelineStateMachine<R>,
    detector: FollowUpDetector,
    ledger: Mutex<SignalLedger>,
    audit: Mutex<AuditLogger>,
}

impl<R: PipelineRepository> PipelineEngine<R> {
    /// Create an engine over `repo`; fails with `Config` on an invalid config
    pub fn new(repo: R, config: EngineConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            registry: CompetencyRegistry::new(),
            matcher: MatchingEngine::new(config.scoring),
            votes: VotingAggregator::new(),
            pipeline: PipelineStateMachine::new(repo),
            detector: FollowUpDetector::new(config.follow_up),
            ledger: Mutex::new(SignalLedger::new()),
            audit: Mutex::new(AuditLogger::new(config.audit_capacity)),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &CompetencyRegistry {
        &self.registry
    }

    pub fn voting(&self) -> &VotingAggregator {
        &self.votes
    }

    pub fn state_machine(&self) -> &PipelineStateMachine<R> {
        &self.pipeline
    }

    fn journal(&self) -> MutexGuard<'_, AuditLogger> {
        // The journal stays usable after a panic elsewhere
        self.audit.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn signals(&self) -> Result<MutexGuard<'_, SignalLedger>> {
        self.ledger
            .lock()
            .map_err(|_| EngineError::Storage("Failed to acquire signal ledger lock".to_string()))
    }

    /// Journal refused transitions and conflicts, then pass the result on
    fn audited<T>(&self, subject: &str, to: &str, now: DateTime<Utc>, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            if matches!(
                err,
                EngineError::InvalidTransition(_)
                    | EngineError::Conflict(_)
                    | EngineError::NotPromotable(_)
            ) {
                warn!(subject, to, error = %err, "Transition rejected");
                self.journal().log_rejected(subject, to, &err.to_string(), now);
            }
        }
        result
    }

    // ========== Records ==========

    pub fn submit_idea(
        &self,
        title: impl Into<String>,
        description: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Idea> {
        let idea = self.pipeline.submit_idea(title, description, now)?;
        info!(idea_id = %idea.id, "Idea submitted");
        Ok(idea)
    }

    pub fn register_idea(&self, idea: Idea) -> Result<Idea> {
        self.pipeline.register_idea(idea)
    }

    pub fn register_engagement(&self, engagement: Engagement) -> Result<Engagement> {
        let engagement = self.pipeline.register_engagement(engagement)?;
        info!(engagement_id = %engagement.id, status = %engagement.status, "Engagement registered");
        Ok(engagement)
    }

    pub fn idea(&self, id: &IdeaId) -> Result<Idea> {
        self.pipeline.idea(id)
    }

    pub fn engagement(&self, id: &EngagementId) -> Result<Engagement> {
        self.pipeline.engagement(id)
    }

    // ========== Voting ==========

    /// Record a vote on an existing idea
    ///
    /// Never changes the idea's status; promotion is a separate call.
    pub fn record_vote(
        &self,
        idea_id: &IdeaId,
        voter_id: VoterId,
        value: VoteValue,
        cast_at: DateTime<Utc>,
    ) -> Result<VoteReceipt> {
        let idea = self.pipeline.idea(idea_id)?;
        let receipt = self
            .votes
            .record_vote(idea.id, voter_id.clone(), value, cast_at)?;
        self.log_vote(&receipt, &voter_id, value, cast_at);
        Ok(receipt)
    }

    /// Record a vote only if the idea's ballot is still at `expected_version`
    ///
    /// The version comes from an earlier `VoteReceipt` (0 before any vote).
    pub fn record_vote_if(
        &self,
        idea_id: &IdeaId,
        voter_id: VoterId,
        value: VoteValue,
        cast_at: DateTime<Utc>,
        expected_version: u64,
    ) -> Result<VoteReceipt> {
        let idea = self.pipeline.idea(idea_id)?;
        let vote = Vote::new(idea.id, voter_id.clone(), value, cast_at);
        let receipt = match self.votes.record_if(vote, expected_version) {
            Ok(receipt) => receipt,
            Err(err) => {
                warn!(idea_id = %idea_id, voter_id = %voter_id, error = %err, "Vote rejected");
                return Err(err);
            }
        };
        self.log_vote(&receipt, &voter_id, value, cast_at);
        Ok(receipt)
    }

    fn log_vote(&self, receipt: &VoteReceipt, voter_id: &VoterId, value: VoteValue, cast_at: DateTime<Utc>) {
        if receipt.outcome == VoteOutcome::Stale {
            debug!(idea_id = %receipt.idea_id, voter_id = %voter_id, "Stale vote ignored");
            return;
        }
        info!(
            idea_id = %receipt.idea_id,
            voter_id = %voter_id,
            value = value.as_i64(),
            tally = receipt.tally,
            "Vote recorded"
        );
        self.journal().log_vote(
            receipt.idea_id.as_str(),
            voter_id.as_str(),
            value.as_i64(),
            receipt.tally,
            cast_at,
        );
    }

    pub fn tally(&self, idea_id: &IdeaId) -> Result<i64> {
        self.pipeline.idea(idea_id)?;
        self.votes.tally(idea_id)
    }

    pub fn vote_breakdown(&self, idea_id: &IdeaId) -> Result<VoteBreakdown> {
        self.pipeline.idea(idea_id)?;
        self.votes.breakdown(idea_id)
    }

    /// Promotable at the configured threshold
    pub fn is_promotable(&self, idea_id: &IdeaId) -> Result<bool> {
        self.is_promotable_with(idea_id, self.config.promotion_threshold)
    }

    pub fn is_promotable_with(&self, idea_id: &IdeaId, threshold: i64) -> Result<bool> {
        let idea = self.pipeline.idea(idea_id)?;
        self.votes.is_promotable(&idea, threshold)
    }

    // ========== Lifecycle ==========

    /// Promote on votes: the current tally must reach the configured threshold
    /// and the idea must still be open for review
    pub fn promote_idea(
        &self,
        idea_id: &IdeaId,
        expected_version: u64,
        draft: EngagementDraft,
        now: DateTime<Utc>,
    ) -> Result<Conversion> {
        self.pipeline.idea(idea_id)?;
        let basis = PromotionBasis::Votes {
            tally: self.votes.tally(idea_id)?,
            threshold: self.config.promotion_threshold,
        };
        self.promote(idea_id, expected_version, basis, draft, now)
    }

    /// Promote regardless of votes
    pub fn promote_idea_manually(
        &self,
        idea_id: &IdeaId,
        expected_version: u64,
        actor: impl Into<String>,
        draft: EngagementDraft,
        now: DateTime<Utc>,
    ) -> Result<Conversion> {
        let basis = PromotionBasis::Manual {
            actor: actor.into(),
        };
        self.promote(idea_id, expected_version, basis, draft, now)
    }

    fn promote(
        &self,
        idea_id: &IdeaId,
        expected_version: u64,
        basis: PromotionBasis,
        draft: EngagementDraft,
        now: DateTime<Utc>,
    ) -> Result<Conversion> {
        let result = self
            .pipeline
            .promote_idea(idea_id, expected_version, &basis, draft, now);
        let conversion = self.audited(
            idea_id.as_str(),
            IdeaStatus::Converted.as_str(),
            now,
            result,
        )?;

        info!(
            idea_id = %idea_id,
            engagement_id = %conversion.engagement.id,
            basis = ?basis,
            "Idea promoted"
        );
        self.log_conversion(&conversion, now);
        Ok(conversion)
    }

    pub fn transition_idea(
        &self,
        idea_id: &IdeaId,
        to: IdeaStatus,
        expected_version: u64,
        now: DateTime<Utc>,
    ) -> Result<IdeaTransition> {
        let result = self
            .pipeline
            .transition_idea(idea_id, to, expected_version, now);
        let transition = self.audited(idea_id.as_str(), to.as_str(), now, result)?;

        info!(idea_id = %idea_id, from = %transition.from, to = %transition.to, "Idea transitioned");
        self.journal().log_transition(
            AuditEventType::IdeaTransition,
            idea_id.as_str(),
            transition.from.as_str(),
            transition.to.as_str(),
            now,
        );
        Ok(transition)
    }

    pub fn transition_engagement(
        &self,
        engagement_id: &EngagementId,
        to: EngagementStatus,
        expected_version: u64,
        now: DateTime<Utc>,
    ) -> Result<EngagementTransition> {
        let result = self
            .pipeline
            .transition_engagement(engagement_id, to, expected_version, now);
        let transition = self.audited(engagement_id.as_str(), to.as_str(), now, result)?;

        info!(
            engagement_id = %engagement_id,
            from = %transition.from,
            to = %transition.to,
            version = transition.record.version,
            "Engagement transitioned"
        );
        self.journal().log_transition(
            AuditEventType::EngagementTransition,
            engagement_id.as_str(),
            transition.from.as_str(),
            transition.to.as_str(),
            now,
        );
        Ok(transition)
    }

    /// Convert an approved idea into a draft engagement
    pub fn convert_idea(
        &self,
        idea_id: &IdeaId,
        expected_version: u64,
        draft: EngagementDraft,
        now: DateTime<Utc>,
    ) -> Result<Conversion> {
        let result = self
            .pipeline
            .convert_idea(idea_id, expected_version, draft, now);
        let conversion = self.audited(
            idea_id.as_str(),
            IdeaStatus::Converted.as_str(),
            now,
            result,
        )?;

        info!(idea_id = %idea_id, engagement_id = %conversion.engagement.id, "Idea converted");
        self.log_conversion(&conversion, now);
        Ok(conversion)
    }

    fn log_conversion(&self, conversion: &Conversion, now: DateTime<Utc>) {
        self.journal().log_conversion(
            conversion.idea.id.as_str(),
            conversion.engagement.id.as_str(),
            now,
        );
    }

    // ========== Matching ==========

    /// Every eligible resource, best first, against the engagement's requirements
    pub fn rank_candidates(&self, engagement_id: &EngagementId) -> Result<Vec<RankedCandidate>> {
        let engagement = self.pipeline.engagement(engagement_id)?;
        let pool = self.registry.snapshot()?;
        let ranked = self.matcher.rank(&engagement.requirements, &pool);

        debug!(
            engagement_id = %engagement_id,
            pool_size = pool.len(),
            candidates = ranked.len(),
            "Candidates ranked"
        );
        self.journal()
            .log_ranking(engagement_id.as_str(), pool.len(), ranked.len(), Utc::now());
        Ok(ranked)
    }

    /// Top `limit` candidates for the engagement
    pub fn shortlist(&self, engagement_id: &EngagementId, limit: usize) -> Result<Vec<RankedCandidate>> {
        let mut ranked = self.rank_candidates(engagement_id)?;
        ranked.truncate(limit);
        Ok(ranked)
    }

    pub fn explain_match(
        &self,
        engagement_id: &EngagementId,
        resource_id: &ResourceId,
    ) -> Result<MatchBreakdown> {
        let engagement = self.pipeline.engagement(engagement_id)?;
        let resource = self.registry.get(resource_id)?;
        Ok(self.matcher.explain(&engagement.requirements, &resource))
    }

    /// Replace a resource's whole competency profile
    pub fn replace_resource(&self, resource: Resource) -> Result<Option<Arc<Resource>>> {
        let id = resource.id.clone();
        let previous = self.registry.replace(resource)?;
        info!(resource_id = %id, replaced = previous.is_some(), "Resource profile stored");
        Ok(previous)
    }

    pub fn load_resources(&self, pool: impl IntoIterator<Item = Resource>) -> Result<()> {
        self.registry.load(pool)?;
        info!(resources = self.registry.len()?, "Resource pool loaded");
        Ok(())
    }

    // ========== Follow-up ==========

    /// Raise one signal per stale entity per SLA window
    pub fn scan_follow_ups(
        &self,
        entities: &[TrackedEntity],
        interactions: &[Interaction],
        now: DateTime<Utc>,
    ) -> Result<Vec<FollowUpSignal>> {
        let raised = {
            let mut ledger = self.signals()?;
            self.detector.scan(entities, interactions, &mut ledger, now)
        };

        if !raised.is_empty() {
            let mut journal = self.journal();
            for signal in &raised {
                journal.log_follow_up(
                    signal.entity_id.as_str(),
                    signal.entity_type.as_str(),
                    signal.window.index,
                    now,
                );
            }
        }
        info!(entities = entities.len(), raised = raised.len(), "Follow-up scan complete");
        Ok(raised)
    }

    /// Close open signals for entities contacted since they were raised
    pub fn resolve_follow_ups(&self, interactions: &[Interaction]) -> Result<Vec<FollowUpSignal>> {
        let closed = self.signals()?.resolve_contacted(interactions);
        if !closed.is_empty() {
            info!(closed = closed.len(), "Follow-up signals resolved");
        }
        Ok(closed)
    }

    pub fn open_follow_ups(&self) -> Result<Vec<FollowUpSignal>> {
        Ok(self.signals()?.open_signals())
    }

    /// Replace the ledger with signals persisted by the caller
    pub fn restore_follow_ups(&self, open: impl IntoIterator<Item = FollowUpSignal>) -> Result<()> {
        *self.signals()? = SignalLedger::from_open(open);
        Ok(())
    }

    // ========== Audit ==========

    pub fn audit_stats(&self) -> AuditStats {
        self.journal().get_stats()
    }

    /// Most recent first
    pub fn recent_audit(&self, limit: usize) -> Vec<AuditEntry> {
        self.journal()
            .get_recent(limit)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn recent_audit_failures(&self, limit: usize) -> Vec<AuditEntry> {
        self.journal()
            .get_recent_failures(limit)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn export_audit(&self) -> serde_json::Value {
        self.journal().export_json()
    }
}
