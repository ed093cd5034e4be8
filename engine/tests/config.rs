//! Configuration of process-wide rank bounds.
//!
//! Environment variables are process state, so every case that touches them
//! lives in a single test.

use ranked_engine::{
    bounds::{MAX_RANK_VAR, MIN_RANK_VAR},
    Error, RankBounds, RankPolicy, MAX_RANK, MIN_RANK,
};
use std::env;

#[test]
fn bounds_from_env() {
    env::remove_var(MIN_RANK_VAR);
    env::remove_var(MAX_RANK_VAR);
    assert_eq!(RankBounds::from_env().unwrap(), RankBounds::new(MIN_RANK, MAX_RANK).unwrap());

    env::set_var(MIN_RANK_VAR, "10");
    env::set_var(MAX_RANK_VAR, " 1000 ");
    let bounds = RankBounds::from_env().unwrap();
    assert_eq!((bounds.min(), bounds.max()), (10, 1000));
    assert_eq!(bounds.median(), 505);

    env::set_var(MAX_RANK_VAR, "lots");
    assert!(matches!(RankBounds::from_env(), Err(Error::InvalidConfig(_))));

    env::set_var(MAX_RANK_VAR, "10");
    assert!(matches!(
        RankBounds::from_env(),
        Err(Error::InvalidBounds { min: 10, max: 10 })
    ));

    env::remove_var(MIN_RANK_VAR);
    env::remove_var(MAX_RANK_VAR);
}

#[test]
fn installed_bounds_reach_new_policies() {
    let bounds = RankBounds::new(-500, 500).unwrap();
    bounds.install().unwrap();

    assert_eq!(RankBounds::global(), bounds);
    assert_eq!(RankPolicy::new("row").bounds(), bounds);

    let again = RankBounds::new(0, 10).unwrap().install();
    assert!(matches!(again, Err(Error::InvalidConfig(_))));
    assert_eq!(RankBounds::global(), bounds);
}
