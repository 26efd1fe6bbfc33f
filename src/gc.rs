/*!
  The garbage collection hook.

  The machine's only native reclamation is truncating the heap to a choice point's
  high-water mark on backtracking. A future collector plugs in through the `Collector`
  trait instead: the resolution controller invokes it at goal dispatch boundaries only,
  never while an instruction sequence is mid-unification, and hands it the full root set
  (argument registers, environment frame slots, saved choice point registers, and the
  trail). Anything reachable from those roots through the heap is live.
*/

use crate::cell::Cell;

/// A read view of every root the machine holds into the heap, valid for the duration of
/// one collection point.
pub struct RootSet<'a> {
  pub heap                : &'a [Cell],
  pub argument_registers  : &'a [Cell],
  /// The permanent-variable slots of each live environment frame.
  pub frame_slots         : Vec<&'a [Cell]>,
  /// The argument registers saved in each choice point.
  pub choice_point_args   : Vec<&'a [Cell]>,
  /// Heap addresses of conditional bindings awaiting possible undo.
  pub trail               : &'a [usize]
}

impl<'a> RootSet<'a> {
  /// Iterates over every root cell.
  pub fn roots(&self) -> impl Iterator<Item = &Cell> {
    self.argument_registers
        .iter()
        .chain(self.frame_slots.iter().flat_map(|slots| slots.iter()))
        .chain(self.choice_point_args.iter().flat_map(|args| args.iter()))
  }
}

/// A collector invoked between resolution steps. The default engine installs none.
pub trait Collector {
  fn collect(&mut self, roots: &RootSet<'_>);
}
