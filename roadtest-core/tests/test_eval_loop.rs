use anyhow::{bail, Result};
use roadtest_core::{
    error::CoreError,
    record::{BufferedRecorder, Record, RecordValue},
    Act, Env, EvalConfig, EvalLoop, FrameStore, Obs, Policy, Step, Termination,
};
use std::collections::VecDeque;
use test_log::test;

#[derive(Clone, Debug, PartialEq)]
struct TinyObs(u64);

impl Obs for TinyObs {
    fn shape(&self) -> [usize; 3] {
        [1, 1, 3]
    }

    fn to_scaled(&self) -> Vec<f32> {
        vec![0.0; 3]
    }
}

#[derive(Clone, Debug, PartialEq)]
struct TriAct(usize);

impl Act for TriAct {
    const N_ACTIONS: usize = 3;

    fn from_index(ix: usize) -> Self {
        assert!(ix < Self::N_ACTIONS);
        Self(ix)
    }

    fn index(&self) -> usize {
        self.0
    }
}

/// Outcome of each episode, as the number of steps before the terminal one.
#[derive(Clone)]
struct ScriptedEnvConfig {
    episodes: Vec<(usize, Termination)>,
    failing_resets: usize,
}

/// An environment playing back scripted episodes.
struct ScriptedEnv {
    episodes: VecDeque<(usize, Termination)>,
    failing_resets: usize,
    current: Option<(usize, Termination)>,
    steps: usize,
    next_obs: u64,
    resets: usize,
    closes: usize,
    acts: Vec<usize>,
}

impl Env for ScriptedEnv {
    type Config = ScriptedEnvConfig;
    type Obs = TinyObs;
    type Act = TriAct;
    type Info = ();

    fn build(config: &Self::Config, _seed: i64) -> Result<Self> {
        Ok(Self {
            episodes: config.episodes.iter().cloned().collect(),
            failing_resets: config.failing_resets,
            current: None,
            steps: 0,
            next_obs: 0,
            resets: 0,
            closes: 0,
            acts: Vec::new(),
        })
    }

    fn reset(&mut self) -> Result<TinyObs> {
        self.resets += 1;
        if self.failing_resets > 0 {
            self.failing_resets -= 1;
            bail!("spawn point occupied");
        }
        self.current = self.episodes.pop_front();
        if self.current.is_none() {
            bail!("no more scripted episodes");
        }
        self.steps = 0;
        self.next_obs += 1;
        Ok(TinyObs(self.next_obs))
    }

    fn step(&mut self, a: &TriAct) -> Result<(Step<Self>, Record)> {
        let (n, termination) = match self.current {
            Some(v) => v,
            None => bail!("step without episode"),
        };
        self.acts.push(a.index());
        self.steps += 1;
        self.next_obs += 1;
        let termination = if self.steps > n {
            Some(termination)
        } else {
            None
        };
        let reward = if termination.is_some() { -200.0 } else { 1.0 };
        let record = Record::from_scalar("speed_kmh", 42.0);
        let step = Step::new(TinyObs(self.next_obs), a.clone(), reward, termination, ());
        Ok((step, record))
    }

    fn close(&mut self) {
        self.current = None;
        self.closes += 1;
    }
}

struct FixedPolicy(Vec<f32>);

impl Policy<ScriptedEnv> for FixedPolicy {
    fn action_values(&mut self, _obs: &TinyObs) -> Result<Vec<f32>> {
        Ok(self.0.clone())
    }
}

#[derive(Default)]
struct VecStore(Vec<(u64, TinyObs)>);

impl FrameStore<TinyObs> for VecStore {
    fn store(&mut self, index: u64, obs: &TinyObs) -> Result<()> {
        self.0.push((index, obs.clone()));
        Ok(())
    }
}

fn eval_loop(
    episodes: Vec<(usize, Termination)>,
    values: Vec<f32>,
    config: EvalConfig,
) -> EvalLoop<ScriptedEnv, FixedPolicy> {
    let env_config = ScriptedEnvConfig {
        episodes,
        failing_resets: 0,
    };
    EvalLoop::new(&env_config, 0, config, FixedPolicy(values)).unwrap()
}

#[test]
fn runs_episodes_until_their_terminal_state() -> Result<()> {
    let episodes = vec![(2, Termination::Crashed), (1, Termination::TimedOut)];
    let config = EvalConfig::default().max_episodes(Some(2));
    let mut eval = eval_loop(episodes, vec![0.1, 0.2, 0.9], config);
    let mut recorder = BufferedRecorder::new();
    let mut frames = VecStore::default();

    let summary = eval.run(&mut recorder, &mut frames)?;

    assert_eq!(summary.episodes, 2);
    assert_eq!(summary.steps, 5);
    assert_eq!(summary.crashed, 1);
    assert_eq!(summary.timed_out, 1);
    assert_eq!(summary.frames, 5);

    // Greedy: the action with the highest value is taken in every step.
    assert_eq!(eval.env().acts, vec![2; 5]);

    // Each episode released its resources.
    assert_eq!(eval.env().closes, 2);
    assert_eq!(eval.fps().len(), 5);

    // One record per step plus one per episode.
    assert_eq!(recorder.len(), 7);
    let first = recorder.iter().next().unwrap();
    assert_eq!(first.get_scalar("action")?, 2.0);
    assert_eq!(first.get_array1("action_values")?, vec![0.1, 0.2, 0.9]);
    assert_eq!(first.get_scalar("speed_kmh")?, 42.0);
    assert!(first.get_scalar("fps")? >= 0.0);
    Ok(())
}

#[test]
fn persists_pre_step_observations_under_increasing_indices() -> Result<()> {
    let episodes = vec![(1, Termination::Crashed), (2, Termination::Crashed)];
    let config = EvalConfig::default().max_episodes(Some(2));
    let mut eval = eval_loop(episodes, vec![1.0, 0.0, 0.0], config);
    let mut frames = VecStore::default();

    eval.run(&mut BufferedRecorder::new(), &mut frames)?;

    let indices: Vec<u64> = frames.0.iter().map(|(i, _)| *i).collect();
    assert_eq!(indices, vec![0, 1, 2, 3, 4]);

    // Episode 1: reset -> obs 1, steps yield 2, 3. Episode 2: reset -> obs 4, steps yield 5, 6, 7.
    let stored: Vec<u64> = frames.0.iter().map(|(_, o)| o.0).collect();
    assert_eq!(stored, vec![1, 2, 4, 5, 6]);
    Ok(())
}

#[test]
fn frame_index_advances_without_persistence() -> Result<()> {
    let config = EvalConfig::default()
        .max_episodes(Some(1))
        .persist_frames(false);
    let mut eval = eval_loop(vec![(3, Termination::TimedOut)], vec![0.0, 1.0, 0.0], config);
    let mut frames = VecStore::default();

    eval.run(&mut BufferedRecorder::new(), &mut frames)?;

    assert!(frames.0.is_empty());
    assert_eq!(eval.frame_index(), 4);
    Ok(())
}

#[test]
fn malformed_policy_output_is_fatal() {
    let config = EvalConfig::default().max_episodes(Some(1));
    let mut eval = eval_loop(vec![(3, Termination::Crashed)], vec![0.0, 1.0], config);

    let err = eval
        .run(&mut BufferedRecorder::new(), &mut VecStore::default())
        .unwrap_err();

    match err.downcast_ref::<CoreError>() {
        Some(CoreError::PolicyOutput { values, .. }) => assert_eq!(values, &vec![0.0, 1.0]),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(eval.env().closes, 1);
}

#[test]
fn non_finite_action_values_are_fatal() {
    let config = EvalConfig::default().max_episodes(Some(1));
    let mut eval = eval_loop(
        vec![(3, Termination::Crashed)],
        vec![0.0, f32::NAN, 1.0],
        config,
    );

    let err = eval
        .run(&mut BufferedRecorder::new(), &mut VecStore::default())
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<CoreError>(),
        Some(CoreError::PolicyOutput { .. })
    ));
}

#[test]
fn disconnection_stops_the_loop() {
    let episodes = vec![(1, Termination::Disconnected), (5, Termination::Crashed)];
    let config = EvalConfig::default().max_episodes(Some(2));
    let mut eval = eval_loop(episodes, vec![0.0, 1.0, 0.0], config);
    let mut recorder = BufferedRecorder::new();

    let err = eval.run(&mut recorder, &mut VecStore::default()).unwrap_err();

    match err.downcast_ref::<CoreError>() {
        Some(CoreError::SimulatorDisconnected { episode, steps }) => {
            assert_eq!(*episode, 0);
            assert_eq!(*steps, 2);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(eval.env().resets, 1);

    let last = recorder.iter().last().unwrap();
    assert_eq!(
        last.get("outcome"),
        Some(&RecordValue::String("disconnected".to_string()))
    );
}

#[test]
fn transient_reset_failures_are_retried() -> Result<()> {
    let env_config = ScriptedEnvConfig {
        episodes: vec![(0, Termination::Crashed)],
        failing_resets: 2,
    };
    let config = EvalConfig::default()
        .max_episodes(Some(1))
        .max_reset_attempts(3);
    let policy = FixedPolicy(vec![0.0, 0.0, 1.0]);
    let mut eval = EvalLoop::<ScriptedEnv, _>::new(&env_config, 0, config, policy)?;

    let summary = eval.run(&mut BufferedRecorder::new(), &mut VecStore::default())?;

    assert_eq!(summary.episodes, 1);
    assert_eq!(eval.env().resets, 3);
    Ok(())
}

#[test]
fn reset_gives_up_after_the_configured_attempts() {
    let env_config = ScriptedEnvConfig {
        episodes: vec![(0, Termination::Crashed)],
        failing_resets: 5,
    };
    let config = EvalConfig::default()
        .max_episodes(Some(1))
        .max_reset_attempts(2);
    let policy = FixedPolicy(vec![0.0, 0.0, 1.0]);
    let mut eval = EvalLoop::<ScriptedEnv, _>::new(&env_config, 0, config, policy).unwrap();

    let err = eval
        .run(&mut BufferedRecorder::new(), &mut VecStore::default())
        .unwrap_err();

    assert!(format!("{:#}", err).contains("spawn point occupied"));
    assert_eq!(eval.env().resets, 2);
}

struct CountingPolicy {
    warmups: usize,
    calls: usize,
}

impl Policy<ScriptedEnv> for CountingPolicy {
    fn action_values(&mut self, _obs: &TinyObs) -> Result<Vec<f32>> {
        self.calls += 1;
        Ok(vec![0.0, 1.0, 0.0])
    }

    fn warmup(&mut self) -> Result<()> {
        assert_eq!(self.calls, 0, "warm-up after the first step");
        self.warmups += 1;
        Ok(())
    }
}

#[test]
fn policy_is_warmed_up_once_before_the_first_step() -> Result<()> {
    let env_config = ScriptedEnvConfig {
        episodes: vec![(1, Termination::Crashed), (1, Termination::Crashed)],
        failing_resets: 0,
    };
    let policy = CountingPolicy {
        warmups: 0,
        calls: 0,
    };
    let config = EvalConfig::default().max_episodes(Some(1));
    let mut eval = EvalLoop::<ScriptedEnv, _>::new(&env_config, 0, config, policy)?;

    eval.run(&mut BufferedRecorder::new(), &mut VecStore::default())?;
    eval.run(&mut BufferedRecorder::new(), &mut VecStore::default())?;

    assert_eq!(eval.policy().warmups, 1);
    assert_eq!(eval.policy().calls, 4);
    Ok(())
}

#[test]
fn frame_numbering_can_continue_from_an_earlier_run() -> Result<()> {
    let episodes = vec![(1, Termination::Crashed)];
    let config = EvalConfig::default().max_episodes(Some(1));
    let mut eval = eval_loop(episodes, vec![1.0, 0.0, 0.0], config).first_frame(100);
    let mut frames = VecStore::default();

    let summary = eval.run(&mut BufferedRecorder::new(), &mut frames)?;

    let indices: Vec<u64> = frames.0.iter().map(|(i, _)| *i).collect();
    assert_eq!(indices, vec![100, 101]);
    assert_eq!(summary.frames, 2);
    assert_eq!(eval.frame_index(), 102);
    Ok(())
}

#[test]
fn episode_records_are_timestamped() -> Result<()> {
    let episodes = vec![(0, Termination::TimedOut), (1, Termination::Crashed)];
    let config = EvalConfig::default().max_episodes(Some(2));
    let mut eval = eval_loop(episodes, vec![1.0, 0.0, 0.0], config);
    let mut recorder = BufferedRecorder::new();

    let before = chrono::Local::now();
    eval.run(&mut recorder, &mut VecStore::default())?;
    let after = chrono::Local::now();

    let times = recorder
        .iter()
        .filter(|r| r.get("episode_return").is_some())
        .map(|r| r.get_date_time("time"))
        .collect::<Result<Vec<_>, _>>()?;
    assert_eq!(times.len(), 2);
    assert!(before <= times[0] && times[0] <= times[1] && times[1] <= after);

    // Step records carry no timestamp.
    let first = recorder.iter().next().unwrap();
    assert!(first.get("time").is_none());
    Ok(())
}
