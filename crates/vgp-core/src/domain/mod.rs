//! Domain logic for the virtual gamepad bridge.
//!
//! This module contains pure logic with no infrastructure dependencies.
//!
//! # What is "domain" in Clean Architecture? (for beginners)
//!
//! Clean Architecture organises code into concentric layers.  The innermost
//! layer is called the **domain**.  Domain code contains the core rules of the
//! application and has **no** imports from OS APIs, sockets, or UI frameworks,
//! so it can be compiled and tested on any platform without external setup.
//!
//! Here the domain answers one question: given what the controller looked like
//! a moment ago and what it looks like now, which keys, mouse buttons, pointer
//! movements, or gamepad changes should the PC see?  Outer layers
//! (injection backends, the network listener) depend on this module, never the
//! other way round.

/// Button, stick, and trigger bindings plus the shared profile store.
pub mod mapping;

/// Edge-detecting translation from readings to injection commands.
pub mod translator;
