use std::{
    collections::{hash_map::Entry, HashMap},
    sync::Arc,
    time::Duration,
};

use tracing::{debug, info, warn};

use concord_common::{
    error::{ConcordError, Result},
    utils::MemberId,
};

use crate::cluster::membership::ClusterMembership;

use super::{policy::DuplicateVotePolicy, topic::VoteTopic};

/// Invoked once per topic with the committed value.
pub type CommitCallback<V> = Arc<dyn Fn(&str, &V) + Send + Sync>;

/// Folds an incoming vote value into the current aggregate.
///
/// Applied strictly in arrival order; it does not need to be commutative.
pub type Reducer<V> = Arc<dyn Fn(&V, V) -> std::result::Result<V, String> + Send + Sync>;

/// What a single `vote` call did to its topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VoteOutcome {
    /// Votes recorded on the topic after this call.
    pub votes: usize,
    /// This vote crossed the quorum limit and fired the commit callback.
    pub committed_now: bool,
    /// The topic entry was reclaimed after this vote.
    pub removed: bool,
    /// The vote was dropped as a repeat under `DuplicateVotePolicy::Ignore`.
    pub duplicate: bool,
}

/// Per-topic vote accumulation with a one-shot commit notification.
///
/// All state transitions happen inside `&mut self` calls; share it behind
/// a mutex so each `vote` is applied as one atomic step.
pub struct QuorumVoteAggregator<V> {
    membership: ClusterMembership,
    topics: HashMap<String, VoteTopic<V>>,
    reducer: Reducer<V>,
    notifier: CommitCallback<V>,
}

impl<V> QuorumVoteAggregator<V> {
    pub fn new(membership: ClusterMembership, reducer: Reducer<V>, notifier: CommitCallback<V>) -> Self {
        Self {
            membership,
            topics: HashMap::new(),
            reducer,
            notifier,
        }
    }

    pub fn add_member(&mut self, member: MemberId) -> bool {
        self.membership.add_member(member)
    }

    pub fn del_member(&mut self, member: &MemberId) -> bool {
        self.membership.del_member(member)
    }

    /// Takes effect for every topic still in flight, not only new ones.
    pub fn set_limit(&mut self, limit: usize) -> Result<()> {
        self.membership.set_limit(limit)
    }

    pub fn limit(&self) -> usize {
        self.membership.limit()
    }

    pub fn members(&self) -> &ClusterMembership {
        &self.membership
    }

    pub fn topic(&self, topic: &str) -> Option<&VoteTopic<V>> {
        self.topics.get(topic)
    }

    pub fn pending_topics(&self) -> usize {
        self.topics.len()
    }

    /// Records `member`'s vote on `topic`.
    ///
    /// 1. An unseen topic is opened with `value` as its aggregate.
    /// 2. An uncommitted topic folds `value` in through the reducer;
    ///    a committed one keeps its value.
    /// 3. The member is appended to the vote list.
    /// 4. Reaching the limit commits the topic and fires the callback once.
    /// 5. Reaching the membership size reclaims the topic.
    ///
    /// A reducer failure returns `ConcordError::Reduce` and leaves the topic
    /// exactly as it was.
    pub fn vote(&mut self, member: MemberId, topic: &str, value: V) -> Result<VoteOutcome> {
        let limit = self.membership.limit();
        let member_count = self.membership.len();
        let policy = self.membership.duplicate_votes();

        let state = match self.topics.entry(topic.to_string()) {
            Entry::Vacant(slot) => {
                debug!("🆕 Topic [{}] opened by [{}]", topic, member);
                slot.insert(VoteTopic::open(value))
            }
            Entry::Occupied(slot) => {
                let state = slot.into_mut();

                if policy == DuplicateVotePolicy::Ignore && state.has_voted(&member) {
                    debug!("🔁 Ignoring repeat vote from [{}] on [{}]", member, topic);
                    return Ok(VoteOutcome {
                        votes: state.votes(),
                        duplicate: true,
                        ..VoteOutcome::default()
                    });
                }

                if !state.committed {
                    let merged = (self.reducer)(&state.aggregated_value, value).map_err(|reason| {
                        warn!("⚠️ Reducer rejected vote from [{}] on [{}]: {}", member, topic, reason);
                        ConcordError::Reduce {
                            topic: topic.to_string(),
                            reason,
                        }
                    })?;
                    state.aggregated_value = merged;
                }
                state
            }
        };

        state.voted_members.push(member.clone());
        let votes = state.votes();
        tracing::info!(target: "consensus", "EVENT:VOTE topic={} member={} votes={} limit={}", topic, member, votes, limit);

        let mut committed_now = false;
        if votes >= limit && !state.committed {
            state.committed = true;
            committed_now = true;
            info!("✅ Topic [{}] committed with {}/{} votes", topic, votes, limit);
            tracing::info!(target: "consensus", "EVENT:COMMIT topic={} votes={}", topic, votes);
            (self.notifier)(topic, &state.aggregated_value);
        }

        let removed = votes >= member_count;
        if removed {
            let committed = state.committed;
            self.topics.remove(topic);
            debug!("🧹 Topic [{}] reclaimed after {} votes (committed: {})", topic, votes, committed);
        }

        Ok(VoteOutcome {
            votes,
            committed_now,
            removed,
            duplicate: false,
        })
    }

    /// Drops topics opened more than `ttl` ago and returns their names.
    ///
    /// Nothing calls this implicitly; without it an unresolved topic lives
    /// until the membership has fully voted.
    pub fn expire_stale(&mut self, ttl: Duration) -> Vec<String> {
        let expired: Vec<String> = self
            .topics
            .iter()
            .filter(|(_, state)| state.age() > ttl)
            .map(|(name, _)| name.clone())
            .collect();

        for name in &expired {
            if let Some(state) = self.topics.remove(name) {
                warn!(
                    "⌛ Topic [{}] expired with {} votes (committed: {})",
                    name,
                    state.votes(),
                    state.committed
                );
            }
        }
        expired
    }
}

impl<V> std::fmt::Debug for QuorumVoteAggregator<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuorumVoteAggregator")
            .field("membership", &self.membership)
            .field("pending_topics", &self.topics.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::config::QuorumConfig;
    use std::sync::Mutex;

    type Commits = Arc<Mutex<Vec<(String, i64)>>>;

    fn sum() -> Reducer<i64> {
        Arc::new(|acc: &i64, v: i64| Ok(acc + v))
    }

    fn aggregator(config: QuorumConfig, members: &[&str], reducer: Reducer<i64>) -> (QuorumVoteAggregator<i64>, Commits) {
        let commits: Commits = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&commits);
        let notifier: CommitCallback<i64> = Arc::new(move |topic: &str, value: &i64| {
            sink.lock().unwrap().push((topic.to_string(), *value));
        });
        let membership = ClusterMembership::with_members(config, members.iter().copied()).unwrap();
        (QuorumVoteAggregator::new(membership, reducer, notifier), commits)
    }

    #[test]
    fn test_commit_fires_once_with_merged_value() {
        let (mut agg, commits) = aggregator(QuorumConfig::with_limit(2), &["A", "B", "C"], sum());

        let first = agg.vote("A".into(), "t", 5).unwrap();
        assert!(!first.committed_now);
        assert_eq!(agg.topic("t").unwrap().aggregated_value, 5);

        let second = agg.vote("B".into(), "t", 7).unwrap();
        assert!(second.committed_now);
        assert!(!second.removed);

        assert_eq!(*commits.lock().unwrap(), vec![("t".to_string(), 12)]);
        assert!(agg.topic("t").unwrap().committed);
    }

    #[test]
    fn test_repeat_votes_count_and_reclaim_topic() {
        let (mut agg, commits) = aggregator(QuorumConfig::with_limit(2), &["A", "B"], sum());

        agg.vote("A".into(), "t", 5).unwrap();
        let outcome = agg.vote("A".into(), "t", 5).unwrap();

        // Two records from one member satisfy both bounds.
        assert_eq!(outcome.votes, 2);
        assert!(outcome.committed_now);
        assert!(outcome.removed);
        assert!(agg.topic("t").is_none());
        assert_eq!(*commits.lock().unwrap(), vec![("t".to_string(), 10)]);

        // B's late vote opens a fresh topic.
        let late = agg.vote("B".into(), "t", 7).unwrap();
        assert_eq!(late.votes, 1);
        assert_eq!(agg.topic("t").unwrap().aggregated_value, 7);
    }

    #[test]
    fn test_late_votes_do_not_recommit_or_merge() {
        let (mut agg, commits) = aggregator(QuorumConfig::with_limit(2), &["A", "B", "C"], sum());

        agg.vote("A".into(), "t", 1).unwrap();
        agg.vote("B".into(), "t", 2).unwrap();

        let late = agg.vote("C".into(), "t", 100).unwrap();
        assert!(!late.committed_now);
        assert!(late.removed);
        assert_eq!(late.votes, 3);
        assert_eq!(commits.lock().unwrap().len(), 1);
        assert_eq!(commits.lock().unwrap()[0].1, 3);
    }

    #[test]
    fn test_late_vote_keeps_committed_value() {
        let (mut agg, _commits) = aggregator(QuorumConfig::with_limit(1), &["A", "B", "C"], sum());

        agg.vote("A".into(), "t", 4).unwrap();
        agg.vote("B".into(), "t", 6).unwrap();

        let state = agg.topic("t").unwrap();
        assert_eq!(state.aggregated_value, 4);
        assert_eq!(state.voted_members, vec![MemberId::from("A"), MemberId::from("B")]);
    }

    #[test]
    fn test_set_limit_applies_to_pending_topics() {
        let (mut agg, commits) = aggregator(QuorumConfig::with_limit(3), &["A", "B", "C", "D"], sum());

        agg.vote("A".into(), "t", 1).unwrap();
        agg.vote("B".into(), "t", 1).unwrap();
        assert!(commits.lock().unwrap().is_empty());

        agg.set_limit(2).unwrap();
        assert_eq!(agg.limit(), 2);

        // Already at 2 votes, but the check only runs on the next vote.
        assert!(commits.lock().unwrap().is_empty());
        let outcome = agg.vote("C".into(), "t", 1).unwrap();
        assert!(outcome.committed_now);
        assert_eq!(*commits.lock().unwrap(), vec![("t".to_string(), 3)]);
    }

    #[test]
    fn test_topic_removed_without_commit_when_limit_exceeds_members() {
        let (mut agg, commits) = aggregator(QuorumConfig::with_limit(5), &["A", "B"], sum());

        agg.vote("A".into(), "t", 1).unwrap();
        let outcome = agg.vote("B".into(), "t", 1).unwrap();

        assert!(outcome.removed);
        assert!(!outcome.committed_now);
        assert!(commits.lock().unwrap().is_empty());
        assert_eq!(agg.pending_topics(), 0);
    }

    #[test]
    fn test_reduce_failure_leaves_topic_untouched() {
        let reducer: Reducer<i64> = Arc::new(|acc: &i64, v: i64| {
            if v < 0 {
                Err(format!("negative vote {v}"))
            } else {
                Ok(acc + v)
            }
        });
        let (mut agg, commits) = aggregator(QuorumConfig::with_limit(2), &["A", "B", "C"], reducer);

        agg.vote("A".into(), "t", 3).unwrap();
        let err = agg.vote("B".into(), "t", -1).unwrap_err();
        assert!(matches!(err, ConcordError::Reduce { ref topic, .. } if topic == "t"));

        let state = agg.topic("t").unwrap();
        assert_eq!(state.aggregated_value, 3);
        assert_eq!(state.votes(), 1);
        assert!(!state.committed);
        assert!(commits.lock().unwrap().is_empty());

        agg.vote("B".into(), "t", 2).unwrap();
        assert_eq!(*commits.lock().unwrap(), vec![("t".to_string(), 5)]);
    }

    #[test]
    fn test_reducer_applied_in_arrival_order() {
        let concat: Reducer<String> = Arc::new(|acc: &String, v: String| Ok(format!("{acc}{v}")));
        let notifier: CommitCallback<String> = Arc::new(|_: &str, _: &String| {});
        let membership = ClusterMembership::with_members(QuorumConfig::with_limit(3), ["A", "B", "C", "D"]).unwrap();
        let mut agg = QuorumVoteAggregator::new(membership, concat, notifier);

        agg.vote("C".into(), "t", "c".to_string()).unwrap();
        agg.vote("A".into(), "t", "a".to_string()).unwrap();
        agg.vote("B".into(), "t", "b".to_string()).unwrap();

        assert_eq!(agg.topic("t").unwrap().aggregated_value, "cab");
    }

    #[test]
    fn test_ignore_policy_drops_repeat_votes() {
        let config = QuorumConfig {
            limit: 2,
            duplicate_votes: DuplicateVotePolicy::Ignore,
            ..QuorumConfig::default()
        };
        let (mut agg, commits) = aggregator(config, &["A", "B"], sum());

        agg.vote("A".into(), "t", 5).unwrap();
        let repeat = agg.vote("A".into(), "t", 5).unwrap();
        assert!(repeat.duplicate);
        assert_eq!(repeat.votes, 1);
        assert!(agg.topic("t").is_some());
        assert!(commits.lock().unwrap().is_empty());

        let outcome = agg.vote("B".into(), "t", 7).unwrap();
        assert!(outcome.committed_now);
        assert!(outcome.removed);
        assert_eq!(*commits.lock().unwrap(), vec![("t".to_string(), 12)]);
    }

    #[test]
    fn test_membership_changes_move_cleanup_bound() {
        let (mut agg, _commits) = aggregator(QuorumConfig::with_limit(1), &["A", "B", "C"], sum());

        agg.vote("A".into(), "t", 1).unwrap();
        assert!(agg.del_member(&"C".into()));

        let outcome = agg.vote("B".into(), "t", 1).unwrap();
        assert!(outcome.removed);
        assert!(agg.add_member("C".into()));
        assert_eq!(agg.members().len(), 3);
    }

    #[test]
    fn test_topics_are_independent() {
        let (mut agg, commits) = aggregator(QuorumConfig::with_limit(2), &["A", "B", "C"], sum());

        agg.vote("A".into(), "x", 1).unwrap();
        agg.vote("A".into(), "y", 10).unwrap();
        agg.vote("B".into(), "y", 20).unwrap();

        assert_eq!(*commits.lock().unwrap(), vec![("y".to_string(), 30)]);
        assert_eq!(agg.topic("x").unwrap().votes(), 1);
        assert_eq!(agg.pending_topics(), 2);
    }

    #[test]
    fn test_expire_stale_only_removes_old_topics() {
        let (mut agg, _commits) = aggregator(QuorumConfig::with_limit(3), &["A", "B", "C"], sum());

        agg.vote("A".into(), "t", 1).unwrap();
        assert!(agg.expire_stale(Duration::from_secs(3600)).is_empty());
        assert_eq!(agg.pending_topics(), 1);

        std::thread::sleep(Duration::from_millis(5));
        let expired = agg.expire_stale(Duration::from_millis(1));
        assert_eq!(expired, vec!["t".to_string()]);
        assert_eq!(agg.pending_topics(), 0);
    }
}
